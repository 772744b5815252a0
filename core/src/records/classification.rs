use serde::{Deserialize, Serialize};

/// IQR feedback classification, serialized as its integer code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum IqrClassification {
    Positive,
    Negative,
    #[default]
    Unclassified,
}

impl IqrClassification {
    pub fn code(self) -> u8 {
        match self {
            IqrClassification::Positive => 0,
            IqrClassification::Negative => 1,
            IqrClassification::Unclassified => 2,
        }
    }
}

impl From<IqrClassification> for u8 {
    fn from(value: IqrClassification) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for IqrClassification {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IqrClassification::Positive),
            1 => Ok(IqrClassification::Negative),
            2 => Ok(IqrClassification::Unclassified),
            other => Err(format!("unknown IQR classification {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_uses_integer_codes() {
        assert_eq!(serde_json::to_string(&IqrClassification::Negative).unwrap(), "1");
        let parsed: IqrClassification = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, IqrClassification::Positive);
        assert!(serde_json::from_str::<IqrClassification>("7").is_err());
    }
}
