use serde::Serialize;

// The feed carries no reliable count, only availability.
pub const IN_STOCK_QUANTITY: i64 = 10;

pub fn target_quantity(in_stock: bool) -> i64 {
    if in_stock { IN_STOCK_QUANTITY } else { 0 }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LocationLevel {
    pub location_id: String,
    pub stocked_quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockedQuantityUpdate {
    pub stocked_quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_quantity_is_absolute() {
        assert_eq!(target_quantity(true), 10);
        assert_eq!(target_quantity(false), 0);
    }

    #[test]
    fn location_level_payload_shape() {
        let level = LocationLevel {
            location_id: "sloc_1".into(),
            stocked_quantity: 10,
        };
        assert_eq!(
            serde_json::to_value(&level).unwrap(),
            json!({"location_id": "sloc_1", "stocked_quantity": 10})
        );
    }
}
