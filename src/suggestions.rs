pub const SUGGESTIONS: &[&str] = &[
    "Show me the orders for CUSTOMER_NAME from 2025-06-21 to 2025-07-31",
    "Get me the orders going from SENDER_CITY_NAME to RECIVER_CITY_NAME",
    "How many shipments were delivered to DESTINATION_CITY?",
    "Show all pending orders",
    "Order status for ORDER_ID",
    "Track order with invoice number INVOICE_NUMBER",
    "Show me all delivered orders within N days",
    "Is service available in pincode PINCODE?",
    "Delivery summary from 2025-06-21 to 2025-07-31",
    "Give me complete details for order ID ORDER_ID",
    "long pending orders",
    "Show pending orders from the last N days",
    "Top delivery pincodes for CUSTOMER_NAME",
    "how delivered orders distributed across cities",
    "Delivered report across cities for CUSTOMER_NAME",
    "Show me the order trend for CUSTOMER_NAME in the past N days",
    "What’s the delay trend in the past N days?",
    "Who is updating most of the delivery statuses?",
];

/// Sidebar shortcuts with concrete values filled in.
pub const INTENTS: &[&str] = &[
    "Show me the orders for Wakefit from 2025-06-21 to 2025-07-31",
    "Get me the orders going from Hyderabad to Visakhapatnam",
    "How many shipments were delivered to Coimbatore?",
    "Show all pending orders",
    "Order status for OLAELE04199",
    "Track order with invoice number 9849577711",
    "Is service available in pincode 530013?",
    "Top delivery pincodes for Ola Ele",
    "Show me the order trend for the past 30 days",
];

/// Suggestions containing what was typed so far, once it is longer than
/// one character. An exact match is not suggested back.
pub fn filter(input: &str) -> Vec<&'static str> {
    if input.chars().count() <= 1 {
        return vec![];
    }
    let needle = input.to_lowercase();
    SUGGESTIONS
        .iter()
        .copied()
        .filter(|s| {
            let lower = s.to_lowercase();
            lower.contains(&needle) && lower != needle
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input() {
        assert!(filter("").is_empty());
        assert!(filter("s").is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let found = filter("PENDING");
        assert_eq!(
            found,
            vec![
                "Show all pending orders",
                "long pending orders",
                "Show pending orders from the last N days"
            ]
        );
    }

    #[test]
    fn test_exact_match_excluded() {
        assert!(!filter("show all pending orders").contains(&"Show all pending orders"));
    }
}
