use serde::{Deserialize, Serialize};

/// A wallet ledger entry. The ledger itself is server-owned; the client
/// only renders what it is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Response data from a wallet top-up
#[derive(Debug, Clone, Deserialize)]
pub struct WalletReceipt {
    pub wallet_balance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ledger_entry() {
        let json = r#"{"id": "t-3", "amount": 500, "type": "topup", "status": "success"}"#;
        let txn: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(txn.amount, 500.0);
        assert_eq!(txn.kind.as_deref(), Some("topup"));
    }
}
