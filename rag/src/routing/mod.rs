//! Structured query classification and templated answers.
//!
//! Aggregate questions ("how many coffee products are there?", "list all
//! chocolate products") are answered straight from [`StructuredMetadata`]
//! without touching retrieval or generation. Routing is a fixed, ordered set
//! of regex rules; there is no trained model involved.

mod signals;

pub use signals::{
    REFERENCE_TERMS, StructuredIntent, has_purchase_intent, has_reference_term, structured_intent,
};

use regex::Regex;

use crate::catalog::StructuredMetadata;
use crate::text::{fold_lower, normalize_key, title_case};

/// Category bucket for store-only products. Only matched as a whole word.
const OTHER_CATEGORY: &str = "other";

/// A category or brand name with the patterns used to spot it in a query.
#[derive(Debug, Clone)]
struct Target {
    name: String,
    /// Whole-word match on the folded query, plural allowed
    word: Option<Regex>,
    /// Normalized spellings (singular and plural) for substring matching
    keys: Vec<String>,
}

impl Target {
    fn new(name: &str, substring_match: bool) -> Self {
        let folded = fold_lower(name);
        let word = Regex::new(&format!(r"\b{}s?\b", regex::escape(&folded))).ok();
        let key = normalize_key(name);
        let keys = if substring_match && key.len() >= 3 {
            vec![format!("{key}s"), key]
        } else {
            Vec::new()
        };
        Self {
            name: name.to_string(),
            word,
            keys,
        }
    }
}

/// Find the first target named in the query, trying whole-word matches on
/// every target before falling back to normalized substring matches.
fn find_target<'a>(targets: &'a [Target], folded: &str, normalized: &str) -> Option<&'a str> {
    targets
        .iter()
        .find(|t| t.word.as_ref().is_some_and(|re| re.is_match(folded)))
        .or_else(|| {
            targets
                .iter()
                .find(|t| t.keys.iter().any(|k| normalized.contains(k.as_str())))
        })
        .map(|t| t.name.as_str())
}

fn product_count(n: usize) -> String {
    if n == 1 {
        "1 product".to_string()
    } else {
        format!("{n} products")
    }
}

fn is_are(n: usize) -> &'static str {
    if n == 1 { "is" } else { "are" }
}

/// Answers count and list questions from precomputed catalog metadata.
#[derive(Debug, Clone)]
pub struct StructuredQueryClassifier {
    metadata: StructuredMetadata,
    categories: Vec<Target>,
    brands: Vec<Target>,
    /// "<owner> ... products" marks a whole-catalog count
    owner_total: Option<Regex>,
}

impl StructuredQueryClassifier {
    pub fn new(metadata: StructuredMetadata) -> Self {
        let categories = metadata
            .categories
            .keys()
            .map(|c| Target::new(c, c != OTHER_CATEGORY))
            .collect();
        let brands = metadata.brands.keys().map(|b| Target::new(b, true)).collect();
        let owner = fold_lower(metadata.owner.trim());
        let owner_total = if owner.is_empty() {
            None
        } else {
            Regex::new(&format!(r"{}.*(products|items)", regex::escape(&owner))).ok()
        };

        Self {
            metadata,
            categories,
            brands,
            owner_total,
        }
    }

    pub fn metadata(&self) -> &StructuredMetadata {
        &self.metadata
    }

    /// Answer the query from metadata, or `None` if it is not a structured
    /// question (the caller then falls through to retrieval).
    pub fn classify_and_answer(&self, query: &str) -> Option<String> {
        let folded = fold_lower(query.trim());
        let answer = match structured_intent(&folded)? {
            StructuredIntent::Count => Some(self.answer_count(&folded)),
            StructuredIntent::List => self.answer_list(&folded),
        };
        match &answer {
            Some(_) => log::debug!("Structured answer for query: {}", query),
            None => log::debug!("List intent without a target, falling through"),
        }
        answer
    }

    fn answer_count(&self, folded: &str) -> String {
        let normalized = normalize_key(folded);
        let total = self.metadata.total_count;

        if let Some(category) = find_target(&self.categories, folded, &normalized) {
            let count = self.metadata.categories[category].count;
            return format!(
                "There {} {} in the {} category.",
                is_are(count),
                product_count(count),
                category
            );
        }

        if self.owner_total.as_ref().is_some_and(|re| re.is_match(folded)) {
            return self.total_answer(folded);
        }

        if let Some(brand) = find_target(&self.brands, folded, &normalized) {
            let count = self.metadata.brands[brand].len();
            return format!(
                "There {} {} under the {} brand.",
                is_are(count),
                product_count(count),
                title_case(brand)
            );
        }

        if signals::asks_for_total(folded) {
            return self.total_answer(folded);
        }

        let category_names = self.category_names();
        if folded.contains("categor") {
            return format!(
                "There are {} product categories: {}.",
                category_names.len(),
                category_names.join(", ")
            );
        }

        format!(
            "We have a total of {} across {} categories.",
            self.owner_products(total),
            category_names.len()
        )
    }

    fn answer_list(&self, folded: &str) -> Option<String> {
        let normalized = normalize_key(folded);

        if let Some(category) = find_target(&self.categories, folded, &normalized) {
            return Some(format!(
                "The products in the {} category are: {}.",
                category,
                self.metadata.categories[category].products.join(", ")
            ));
        }

        if let Some(brand) = find_target(&self.brands, folded, &normalized) {
            return Some(format!(
                "The {} products are: {}.",
                title_case(brand),
                self.metadata.brands[brand].join(", ")
            ));
        }

        if signals::asks_for_all_products(folded) || self.mentions_owner_products(folded) {
            let owner = self.metadata.owner.trim();
            let label = if owner.is_empty() {
                "products".to_string()
            } else {
                format!("{owner} products")
            };
            return Some(format!(
                "Here are all the {}: {}.",
                label,
                self.metadata.all_products().join(", ")
            ));
        }

        if folded.contains("categor") {
            return Some(format!(
                "The product categories are: {}.",
                self.category_names().join(", ")
            ));
        }

        None
    }

    fn total_answer(&self, folded: &str) -> String {
        let total = self.metadata.total_count;
        if folded.contains("site") || folded.contains("listed") {
            format!(
                "There {} {} listed on our site.",
                is_are(total),
                self.owner_products(total)
            )
        } else {
            let owner = self.metadata.owner.trim();
            if owner.is_empty() {
                format!("We offer {} in our database.", product_count(total))
            } else {
                format!("{} offers {} in our database.", owner, product_count(total))
            }
        }
    }

    fn mentions_owner_products(&self, folded: &str) -> bool {
        self.owner_total.as_ref().is_some_and(|re| re.is_match(folded))
            && folded.contains("all")
    }

    /// "15 Nestlé products", or "15 products" without an owner.
    fn owner_products(&self, n: usize) -> String {
        let owner = self.metadata.owner.trim();
        if owner.is_empty() {
            product_count(n)
        } else if n == 1 {
            format!("1 {owner} product")
        } else {
            format!("{n} {owner} products")
        }
    }

    fn category_names(&self) -> Vec<&str> {
        self.metadata.categories.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;

    fn classifier() -> StructuredQueryClassifier {
        StructuredQueryClassifier::new(StructuredMetadata::derive(&sample_catalog()))
    }

    // --- Count answers ---

    #[test]
    fn test_count_category() {
        let answer = classifier()
            .classify_and_answer("How many coffee products are there?")
            .unwrap();
        assert_eq!(answer, "There are 5 products in the coffee category.");
    }

    #[test]
    fn test_count_category_normalized_and_plural() {
        let c = classifier();
        assert_eq!(
            c.classify_and_answer("How many icecream products are there?").unwrap(),
            "There is 1 product in the ice cream category."
        );
        assert_eq!(
            c.classify_and_answer("How many coffees are available?").unwrap(),
            "There are 5 products in the coffee category."
        );
    }

    #[test]
    fn test_count_brand_normalized() {
        let answer = classifier()
            .classify_and_answer("How many HaagenDazs products are there?")
            .unwrap();
        assert_eq!(answer, "There is 1 product under the Häagen-Dazs brand.");
    }

    #[test]
    fn test_count_total_listed_on_site() {
        let answer = classifier()
            .classify_and_answer("How many Nestlé products are listed on the site?")
            .unwrap();
        assert_eq!(answer, "There are 15 Nestlé products listed on our site.");
    }

    #[test]
    fn test_count_total_number() {
        let answer = classifier()
            .classify_and_answer("What is the total number of products?")
            .unwrap();
        assert_eq!(answer, "Nestlé offers 15 products in our database.");
    }

    #[test]
    fn test_count_category_wins_over_availability_phrasing() {
        let answer = classifier()
            .classify_and_answer("How many chocolate products are available?")
            .unwrap();
        assert_eq!(answer, "There are 4 products in the chocolate category.");
    }

    #[test]
    fn test_count_categories() {
        let answer = classifier()
            .classify_and_answer("How many categories are there?")
            .unwrap();
        assert_eq!(
            answer,
            "There are 6 product categories: chocolate, coffee, dairy, ice cream, other, water."
        );
    }

    // --- List answers ---

    #[test]
    fn test_list_category() {
        let answer = classifier()
            .classify_and_answer("List all chocolate products")
            .unwrap();
        assert_eq!(
            answer,
            "The products in the chocolate category are: KitKat, Aero, Smarties, After Eight."
        );
    }

    #[test]
    fn test_list_brand() {
        let answer = classifier()
            .classify_and_answer("List all SanPellegrino products")
            .unwrap();
        assert_eq!(answer, "The San Pellegrino products are: San Pellegrino.");
    }

    #[test]
    fn test_list_all_products() {
        let answer = classifier()
            .classify_and_answer("What are all the products?")
            .unwrap();
        assert!(answer.starts_with("Here are all the Nestlé products: "));
        assert!(answer.contains("Turtles"));
    }

    #[test]
    fn test_list_other_category_whole_word_only() {
        let c = classifier();
        assert_eq!(
            c.classify_and_answer("Which products are in the other category?").unwrap(),
            "The products in the other category are: Turtles."
        );
    }

    #[test]
    fn test_list_without_target_falls_through() {
        assert_eq!(classifier().classify_and_answer("What is the price of Smarties?"), None);
    }

    // --- Non-structured ---

    #[test]
    fn test_open_question_is_none() {
        let c = classifier();
        assert_eq!(c.classify_and_answer("Tell me about KitKat"), None);
        assert_eq!(c.classify_and_answer("Where can I buy Nescafé?"), None);
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let q = "How many water products are there?";
        assert_eq!(c.classify_and_answer(q), c.classify_and_answer(q));
        assert_eq!(
            c.classify_and_answer(q).unwrap(),
            "There are 3 products in the water category."
        );
    }

    #[test]
    fn test_without_owner() {
        let mut metadata = StructuredMetadata::derive(&sample_catalog());
        metadata.owner.clear();
        let c = StructuredQueryClassifier::new(metadata);
        assert_eq!(
            c.classify_and_answer("What is the total number of products?").unwrap(),
            "We offer 15 products in our database."
        );
    }
}
