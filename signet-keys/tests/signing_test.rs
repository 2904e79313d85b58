use signet_keys::{sha256_hex, sign, verify, RsaKeyPair};

#[test]
fn sign_verify_round_trip() {
    let keypair = RsaKeyPair::generate().expect("keygen");
    let payload = br#"{"amount":{"value":"10.00","currency":"EUR"}}"#;

    let signature = sign(&keypair, payload).expect("sign");
    let public_pem = keypair.public_key_pem().expect("public pem");

    assert!(verify(&public_pem, payload, &signature));
}

#[test]
fn signing_is_deterministic() {
    let keypair = RsaKeyPair::generate().expect("keygen");
    let payload = b"exact bytes matter";

    let first = sign(&keypair, payload).expect("sign");
    let second = sign(&keypair, payload).expect("sign");
    assert_eq!(first, second, "PKCS#1 v1.5 signatures carry no randomness");
}

#[test]
fn different_payloads_yield_different_signatures() {
    let keypair = RsaKeyPair::generate().expect("keygen");
    let a = sign(&keypair, b"payload a").expect("sign");
    let b = sign(&keypair, b"payload b").expect("sign");
    assert_ne!(a, b);
}

#[test]
fn tampered_payload_fails_verification() {
    let keypair = RsaKeyPair::generate().expect("keygen");
    let payload = b"original body";
    let signature = sign(&keypair, payload).expect("sign");
    let public_pem = keypair.public_key_pem().expect("public pem");

    assert!(!verify(&public_pem, b"original body ", &signature));
    assert!(!verify(&public_pem, b"", &signature));
}

#[test]
fn signature_from_another_key_fails_verification() {
    let signer = RsaKeyPair::generate().expect("keygen");
    let other = RsaKeyPair::generate().expect("keygen");
    let payload = b"some body";

    let signature = sign(&signer, payload).expect("sign");
    let wrong_public = other.public_key_pem().expect("public pem");
    assert!(!verify(&wrong_public, payload, &signature));
}

#[test]
fn verify_is_total_on_malformed_input() {
    let keypair = RsaKeyPair::generate().expect("keygen");
    let public_pem = keypair.public_key_pem().expect("public pem");
    let signature = sign(&keypair, b"body").expect("sign");

    // malformed base64
    assert!(!verify(&public_pem, b"body", "%%% not base64 %%%"));
    // valid base64, not a signature
    assert!(!verify(&public_pem, b"body", "aGVsbG8="));
    // malformed public key
    assert!(!verify("not a pem", b"body", &signature));
    assert!(!verify("", b"body", &signature));
}

#[test]
fn sha256_known_vectors() {
    assert_eq!(
        sha256_hex(""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_eq!(
        sha256_hex("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn sha256_equal_inputs_equal_digests() {
    assert_eq!(sha256_hex("session-token"), sha256_hex("session-token"));
    assert_ne!(sha256_hex("session-token"), sha256_hex("session-token2"));
}

#[test]
fn sha256_handles_non_ascii_input() {
    let a = sha256_hex("überweisung €100");
    let b = sha256_hex("überweisung €101");
    assert_eq!(a.len(), 64);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
}
