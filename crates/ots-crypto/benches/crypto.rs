use ots_crypto::{decrypt, encrypt, CipherKey, KdfParams, KeyDerivation};
use secrecy::SecretString;

fn make_message(size: usize) -> String {
    (0..size)
        .map(|i| (b'a' + (i.wrapping_mul(7) % 26) as u8) as char)
        .collect()
}

#[divan::bench(args = [64, 4096, 65536])]
fn bench_encrypt(bencher: divan::Bencher, size: usize) {
    let key = CipherKey::generate();
    let message = make_message(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| encrypt(divan::black_box(&message), divan::black_box(&key)).unwrap());
}

#[divan::bench(args = [64, 4096, 65536])]
fn bench_decrypt(bencher: divan::Bencher, size: usize) {
    let key = CipherKey::generate();
    let token = encrypt(&make_message(size), &key).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| decrypt(divan::black_box(&token), divan::black_box(&key)).unwrap());
}

/// Production Argon2id cost; this is the latency every passphrase pays twice.
#[divan::bench(sample_count = 10)]
fn bench_derive_default_params(bencher: divan::Bencher) {
    let kdf = KeyDerivation::new(
        CipherKey::generate(),
        "b3RzLWZpeGVkLXNhbHQ",
        &KdfParams::default(),
    )
    .unwrap();
    let passphrase = SecretString::from("correct horse battery staple");
    bencher.bench(|| kdf.derive(divan::black_box(Some(&passphrase))).unwrap());
}

fn main() {
    divan::main();
}
