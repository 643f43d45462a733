use confpass_payments::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn provider_parse_is_case_insensitive() {
    assert_eq!("PAYSTACK".parse::<PaymentProvider>().unwrap(), PaymentProvider::Paystack);
    assert_eq!(" flutterwave ".parse::<PaymentProvider>().unwrap(), PaymentProvider::Flutterwave);
    assert!(matches!(
        "stripe".parse::<PaymentProvider>(),
        Err(PaymentError::UnsupportedProvider(name)) if name == "stripe"
    ));
}

#[test]
fn provider_serde_is_lowercase() {
    assert_eq!(serde_json::to_string(&PaymentProvider::Flutterwave).unwrap(), "\"flutterwave\"");
    let back: PaymentProvider = serde_json::from_str("\"paystack\"").unwrap();
    assert_eq!(back, PaymentProvider::Paystack);
}

#[test]
fn currency_codes() {
    assert_eq!(Currency::Ngn.to_string(), "NGN");
    assert_eq!(serde_json::to_string(&Currency::Ghs).unwrap(), "\"GHS\"");
    assert_eq!("kes".parse::<Currency>().unwrap(), Currency::Kes);
    assert!("XOF".parse::<Currency>().is_err());
}

#[test]
fn minor_unit_conversion() {
    assert_eq!(to_minor_units(dec!(15000.50)).unwrap(), 1_500_050);
    assert_eq!(to_minor_units(dec!(1)).unwrap(), 100);
    assert_eq!(from_minor_units(1_500_050), dec!(15000.50));
    assert!(matches!(to_minor_units(dec!(1.005)), Err(PaymentError::InvalidAmount(_))));
}

#[test]
fn minor_unit_conversion_rejects_overflow() {
    assert!(matches!(to_minor_units(Decimal::MAX), Err(PaymentError::InvalidAmount(_))));
    assert!(matches!(
        to_minor_units(Decimal::from(i64::MAX)),
        Err(PaymentError::InvalidAmount(_))
    ));
}

#[test]
fn generated_references_are_unique_and_prefixed() {
    let a = generate_reference("conf");
    let b = generate_reference("conf");
    assert_ne!(a, b);
    assert!(a.starts_with("CONF-"));
    assert_eq!(a.len(), 37);
    assert!(a[5..].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn valid_request_passes() {
    PaymentRequest::new(dec!(2500.00), Currency::Ngn, "ada@example.com")
        .with_reference("CONF-abc_1.2")
        .with_callback_url("https://tickets.example.com/done")
        .validate()
        .unwrap();
}

#[test]
fn request_validation_failures() {
    let base = || PaymentRequest::new(dec!(10), Currency::Ngn, "ada@example.com");

    let cases = [
        PaymentRequest::new(dec!(-1), Currency::Ngn, "ada@example.com"),
        PaymentRequest::new(dec!(10.001), Currency::Ngn, "ada@example.com"),
        PaymentRequest::new(dec!(10), Currency::Ngn, "ada@"),
        PaymentRequest::new(dec!(10), Currency::Ngn, "ada example@x.com"),
        base().with_callback_url("javascript:alert(1)"),
        base().with_reference("has space"),
        base().with_reference(""),
        base().with_reference(".."),
        base().with_reference("."),
        PaymentRequest::new(Decimal::MAX, Currency::Ngn, "ada@example.com"),
    ];
    for request in cases {
        assert!(request.validate().is_err(), "{request:?}");
    }
}

#[test]
fn trailing_zeros_do_not_count_as_extra_precision() {
    PaymentRequest::new(dec!(10.5000), Currency::Ngn, "ada@example.com")
        .validate()
        .unwrap();
}

#[test]
fn verification_success_flag() {
    let v = PaymentVerification {
        provider: PaymentProvider::Paystack,
        reference: "CONF-1".into(),
        status: PaymentStatus::Reversed,
        amount: dec!(100),
        currency: Currency::Ngn,
        provider_transaction_id: None,
        paid_at: None,
        fees: None,
        customer_email: None,
        gateway_response: None,
    };
    assert!(!v.is_successful());
}
