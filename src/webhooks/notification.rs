//! Pay2 payment notifications.

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use std::fmt;

/// Payment state reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Paid,
    Cancelled,
    Error,
    /// Any status this crate does not know about, kept verbatim
    Unknown(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
            Self::Unknown(other) => other,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "paid" => Self::Paid,
            "cancelled" => Self::Cancelled,
            "error" => Self::Error,
            _ => Self::Unknown(value),
        }
    }
}

impl From<&str> for PaymentStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment notification, either decrypted from the signature or posted in the body
///
/// Every field is optional: the gateway omits some of them depending on the
/// status, and an incomplete body is acknowledged rather than rejected.
/// Amounts stay as raw JSON values because the gateway sends both `1` and
/// `"1.00"` for the same amount. Invoice and external numbers are kept as
/// text even when they arrive as JSON numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pay2Notification {
    #[serde(default, deserialize_with = "string_or_number")]
    pub invoice_number: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub external_number: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub handling_fee: Option<Value>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
}

/// Read an identifier sent either as a JSON string or a JSON number
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or a number, got {}",
            other
        ))),
    }
}

impl Pay2Notification {
    /// Key used to de-duplicate deliveries: `{invoice_number}:{status}`
    ///
    /// `None` when either part is missing.
    pub fn idempotency_key(&self) -> Option<String> {
        match (&self.invoice_number, &self.status) {
            (Some(invoice), Some(status)) if !invoice.is_empty() => {
                Some(format!("{}:{}", invoice, status))
            }
            _ => None,
        }
    }
}

/// A required field that is missing or differs between the signed
/// notification and the request body
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadMismatch {
    #[error("field `{0}` is missing")]
    Missing(&'static str),

    #[error("field `{0}` does not match the signed notification")]
    Differs(&'static str),
}

/// Compare the signed notification with the unsigned request body
///
/// The five fields that move money must be present in both and loosely
/// equal. Strings compare exactly; amounts compare numerically so `1` and
/// `"1.00"` are the same.
pub fn cross_check(
    signed: &Pay2Notification,
    body: &Pay2Notification,
) -> Result<(), PayloadMismatch> {
    compare_text(
        "invoice_number",
        signed.invoice_number.as_deref(),
        body.invoice_number.as_deref(),
    )?;
    compare_text(
        "external_number",
        signed.external_number.as_deref(),
        body.external_number.as_deref(),
    )?;
    compare_amount("amount", signed.amount.as_ref(), body.amount.as_ref())?;
    compare_text(
        "currency_code",
        signed.currency_code.as_deref(),
        body.currency_code.as_deref(),
    )?;
    compare_text(
        "status",
        signed.status.as_ref().map(PaymentStatus::as_str),
        body.status.as_ref().map(PaymentStatus::as_str),
    )?;
    Ok(())
}

fn compare_text(
    field: &'static str,
    signed: Option<&str>,
    body: Option<&str>,
) -> Result<(), PayloadMismatch> {
    match (signed, body) {
        (Some(a), Some(b)) if a == b => Ok(()),
        (Some(_), Some(_)) => Err(PayloadMismatch::Differs(field)),
        _ => Err(PayloadMismatch::Missing(field)),
    }
}

fn compare_amount(
    field: &'static str,
    signed: Option<&Value>,
    body: Option<&Value>,
) -> Result<(), PayloadMismatch> {
    let (Some(signed), Some(body)) = (signed, body) else {
        return Err(PayloadMismatch::Missing(field));
    };

    let equal = match (as_number(signed), as_number(body)) {
        (Some(a), Some(b)) => a == b,
        _ => signed == body,
    };

    if equal {
        Ok(())
    } else {
        Err(PayloadMismatch::Differs(field))
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signed() -> Pay2Notification {
        serde_json::from_value(json!({
            "invoice_number": "IN2212956367",
            "external_number": "TN121750056778",
            "amount": 1,
            "handling_fee": 0,
            "currency_code": "USD",
            "description": "Start (month)",
            "status": "paid"
        }))
        .unwrap()
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(PaymentStatus::from("paid"), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from("cancelled"), PaymentStatus::Cancelled);
        assert_eq!(PaymentStatus::from("error"), PaymentStatus::Error);
        assert_eq!(
            PaymentStatus::from("refunded"),
            PaymentStatus::Unknown("refunded".to_string())
        );
        assert_eq!(PaymentStatus::from("refunded").to_string(), "refunded");
    }

    #[test]
    fn test_deserialize_partial_body() {
        let body: Pay2Notification = serde_json::from_value(json!({"status": "paid"})).unwrap();
        assert_eq!(body.status, Some(PaymentStatus::Paid));
        assert!(body.invoice_number.is_none());
        assert!(body.idempotency_key().is_none());
    }

    #[test]
    fn test_serialize_status_as_string() {
        let value = serde_json::to_value(signed()).unwrap();
        assert_eq!(value["status"], "paid");
    }

    #[test]
    fn test_idempotency_key() {
        assert_eq!(signed().idempotency_key().as_deref(), Some("IN2212956367:paid"));

        let mut blank = signed();
        blank.invoice_number = Some(String::new());
        assert!(blank.idempotency_key().is_none());
    }

    #[test]
    fn test_cross_check_identical() {
        assert!(cross_check(&signed(), &signed()).is_ok());
    }

    #[test]
    fn test_cross_check_amount_is_numeric() {
        let mut body = signed();
        body.amount = Some(json!("1.00"));
        assert!(cross_check(&signed(), &body).is_ok());

        body.amount = Some(json!("2"));
        assert_eq!(
            cross_check(&signed(), &body),
            Err(PayloadMismatch::Differs("amount"))
        );
    }

    #[test]
    fn test_numeric_identifiers_are_read_as_text() {
        let body: Pay2Notification = serde_json::from_value(json!({
            "invoice_number": 2212956367u64,
            "external_number": 121750056778u64,
            "amount": "1.00",
            "currency_code": "USD",
            "status": "paid"
        }))
        .unwrap();
        assert_eq!(body.invoice_number.as_deref(), Some("2212956367"));
        assert_eq!(body.external_number.as_deref(), Some("121750056778"));

        let mut signed = signed();
        signed.invoice_number = Some("2212956367".to_string());
        signed.external_number = Some("121750056778".to_string());
        assert_eq!(cross_check(&signed, &body), Ok(()));

        let null: Pay2Notification = serde_json::from_value(json!({"invoice_number": null})).unwrap();
        assert_eq!(null.invoice_number, None);

        assert!(serde_json::from_value::<Pay2Notification>(json!({"invoice_number": [1]})).is_err());
    }

    #[test]
    fn test_cross_check_ignores_description_and_fee() {
        let mut body = signed();
        body.description = Some("edited".to_string());
        body.handling_fee = None;
        assert!(cross_check(&signed(), &body).is_ok());
    }

    #[test]
    fn test_cross_check_detects_changed_status() {
        let mut body = signed();
        body.status = Some(PaymentStatus::Cancelled);
        assert_eq!(
            cross_check(&signed(), &body),
            Err(PayloadMismatch::Differs("status"))
        );
    }

    #[test]
    fn test_cross_check_requires_fields() {
        let mut body = signed();
        body.currency_code = None;
        assert_eq!(
            cross_check(&signed(), &body),
            Err(PayloadMismatch::Missing("currency_code"))
        );

        let mut unsigned = signed();
        unsigned.external_number = None;
        assert_eq!(
            cross_check(&unsigned, &signed()),
            Err(PayloadMismatch::Missing("external_number"))
        );
    }
}
