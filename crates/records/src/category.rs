//! Order categorisation.
//!
//! Categories are not part of the source exports. They are inferred from the order type and
//! description by an ordered rule table: the first rule with a matching keyword wins, and orders
//! matching no rule fall into [`OrderCategory::Other`]. Matching is case-insensitive substring
//! matching, so short keywords such as `ct` also match inside longer words.

use crate::model::OrderCategory;

/// One row of the categorisation table.
#[derive(Debug)]
pub struct CategoryRule {
    pub category: OrderCategory,
    /// Keywords looked up in the order type.
    pub order_type_keywords: &'static [&'static str],
    /// Keywords looked up in the description.
    pub description_keywords: &'static [&'static str],
}

impl CategoryRule {
    fn matches(&self, order_type: &str, description: &str) -> bool {
        self.order_type_keywords
            .iter()
            .any(|keyword| order_type.contains(keyword))
            || self
                .description_keywords
                .iter()
                .any(|keyword| description.contains(keyword))
    }
}

/// Rules in evaluation order.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: OrderCategory::Laboratory,
        order_type_keywords: &["lab"],
        description_keywords: &["lab", "blood", "urine", "culture", "test"],
    },
    CategoryRule {
        category: OrderCategory::Therapy,
        order_type_keywords: &["therapy"],
        description_keywords: &["therapy", "physical", "occupational", "speech"],
    },
    CategoryRule {
        category: OrderCategory::Imaging,
        order_type_keywords: &["imaging"],
        description_keywords: &["x-ray", "ct", "mri", "ultrasound", "scan"],
    },
    CategoryRule {
        category: OrderCategory::Dietary,
        order_type_keywords: &["diet"],
        description_keywords: &["diet", "nutrition", "food"],
    },
    CategoryRule {
        category: OrderCategory::Consultation,
        order_type_keywords: &["consult"],
        description_keywords: &["consult", "referral"],
    },
];

/// Categorises an order from its type and description.
pub fn categorise_order(order_type: &str, description: &str) -> OrderCategory {
    let order_type = order_type.to_lowercase();
    let description = description.to_lowercase();

    CATEGORY_RULES
        .iter()
        .find(|rule| rule.matches(&order_type, &description))
        .map(|rule| rule.category)
        .unwrap_or(OrderCategory::Other)
}
