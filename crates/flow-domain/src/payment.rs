use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Qr,
    Link,
    PagoMisCuentas,
    InterBanking,
    XnGroup,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Qr => "qr",
            PaymentMethod::Link => "link",
            PaymentMethod::PagoMisCuentas => "pago_mis_cuentas",
            PaymentMethod::InterBanking => "inter_banking",
            PaymentMethod::XnGroup => "xn_group",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_snake_case() {
        let v = serde_json::to_value(PaymentMethod::PagoMisCuentas).unwrap();
        assert_eq!(v, serde_json::json!("pago_mis_cuentas"));
    }
}
