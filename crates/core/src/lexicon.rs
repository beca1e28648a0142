//! Fixed word tables for stock and sales reports (pharma / FMCG distribution).

use crate::types::ValueType;

/// Tokens that strongly indicate a column header.
pub const HEADER_KEYWORDS: &[&str] = &[
    "product", "name", "pack", "unit", "qty", "qty.", "quantity", "open", "close", "op", "cl",
    "sales", "sale", "purchase", "pur", "recv", "recd", "in", "out", "inqty", "outqty", "clqty",
    "clval", "val", "amount", "batch", "exp", "expiry", "mrp", "ptr", "pts", "rate", "order",
    "pend", "lstsl", "lstmove", "stk", "value", "stock", "gd", "gdin", "tot", "near", "co",
];

/// Canonical headers (lowercased) that earn the domain boost.
pub const DOMAIN_PRIORITY_HEADERS: &[&str] = &[
    "product", "name", "pack", "batch", "mrp", "ptr", "pts", "qty", "value", "sales", "purchase",
    "stock", "open", "close", "in", "out", "order", "pending", "expiry", "product name",
    "batch no", "expiry date", "quantity", "amount", "rate", "cl qty", "cl val", "co op qty",
];

/// Adjacent reconstructed columns that spell one known label.
pub const COMPOUND_LABELS: &[(&[&str], &str)] = &[
    (&["product", "name"], "Product Name"),
    (&["prod", "name"], "Product Name"),
    (&["cl", "qty"], "Cl Qty"),
    (&["cl", "val"], "Cl Val"),
    (&["co", "op", "qty"], "Co Op Qty"),
];

/// Column texts that are never headers.
pub const SKIP_EXACT: &[&str] = &["page", ":", ".", ""];

/// Words that mark titles, footers and watermarks when they stand alone.
pub const NEGATIVE_LEXICON: &[&str] = &[
    "page", "report", "statement", "stock", "sales report", "date:", "time:", "generated",
    "confidential", "gstin", "address", "phone", "email", "invoice", "document", "copy",
    "original", "duplicate", "page no", "page no.", "page number", "of",
];

/// Headers that may legitimately contain a negative word.
pub const ALLOWED_COMPOUNDS: &[&str] = &[
    "invoice date", "invoice no", "expiry date", "product name", "batch no", "sales quantity",
    "stock statement", "stock report",
];

/// Leading header tuples that identify a total row read as a header.
pub const FOOTER_LIKE_HEADERS: &[&[&str]] = &[&["grand", "tot"], &["grand", "total"], &["total"], &["grand"]];

/// Short column abbreviations the normalizer keeps verbatim.
pub const SHORT_COLUMN_TOKENS: &[&str] = &["in", "op", "cl", "tot", "exp", "out", "gd", "sale"];

/// Surface spellings and their canonical header names. Keys are matched after
/// key normalisation, so punctuation variants collapse; a later entry for the
/// same normalised key overrides the earlier value but keeps its position.
pub const DOMAIN_SYNONYMS: &[(&str, &str)] = &[
    ("qty", "Quantity"),
    ("quantity", "Quantity"),
    ("net qty", "Net Quantity"),
    ("net quantity", "Net Quantity"),
    ("sales qty", "Sales Quantity"),
    ("free qty", "Free Quantity"),
    ("product name", "Product Name"),
    ("product", "Product Name"),
    ("item name", "Product Name"),
    ("item", "Product Name"),
    ("batch", "Batch No"),
    ("batch no", "Batch No"),
    ("batch no.", "Batch No"),
    ("batch number", "Batch No"),
    ("expiry", "Expiry Date"),
    ("expiry date", "Expiry Date"),
    ("exp date", "Expiry Date"),
    ("exp.", "Expiry Date"),
    ("mrp", "MRP"),
    ("m.r.p", "MRP"),
    ("ptr", "PTR"),
    ("pts", "PTS"),
    ("rate", "Rate"),
    ("price", "Rate"),
    ("amount", "Amount"),
    ("value", "Amount"),
    ("scheme", "Scheme"),
    ("free", "Free Quantity"),
    ("gst", "GST"),
    ("gst %", "GST"),
    ("tax", "GST"),
    ("invoice no", "Invoice No"),
    ("invoice no.", "Invoice No"),
    ("invoice number", "Invoice No"),
    ("inv no", "Invoice No"),
    ("date", "Date"),
    ("invoice date", "Invoice Date"),
    ("bill date", "Invoice Date"),
    ("product code", "Product Code"),
    ("code", "Product Code"),
    ("hsn", "HSN"),
    ("hsn code", "HSN"),
    ("discount", "Discount"),
    ("pack", "Pack"),
    ("pack size", "Pack Size"),
    ("unit", "Unit"),
    ("strip", "Strip"),
    ("box", "Box"),
    ("lstsl", "LstSL"),
    ("lstmove", "LstMove"),
    ("stk.value", "Stk.Value"),
    ("stk value", "Stk.Value"),
    ("recd", "Recd."),
    ("recd.", "Recd."),
    ("cl qty", "Cl Qty"),
    ("cl val", "Cl Val"),
    ("cl val.", "Cl Val"),
    ("gdin", "Gd.In"),
    ("gd.in", "Gd.In"),
    ("tot", "Tot"),
    ("pur", "Purchase"),
    ("op", "Op"),
    ("cl", "Cl"),
    ("inqty", "InQty"),
    ("outqty", "OutQty"),
    ("co op qty", "Co Op Qty"),
    ("exp", "Exp"),
    ("exp.", "Exp"),
    ("out", "Out"),
    ("out.", "Out."),
    ("closing", "Closing"),
    ("order", "Order"),
    ("pend", "Pend"),
    ("near", "Near"),
    ("gd", "Gd"),
    ("sale", "Sale"),
    ("sales", "Sales"),
    ("stock", "Stock"),
];

/// Value type a canonical header's column is expected to hold.
pub fn expected_type(canonical: &str) -> ValueType {
    match canonical {
        "Expiry Date" | "Invoice Date" | "Date" => ValueType::Date,
        "Invoice No" | "Product Code" | "Batch No" | "HSN" => ValueType::Alphanumeric,
        "Product Name" | "Pack" | "Unit" => ValueType::Text,
        "Quantity" | "Net Quantity" | "Sales Quantity" | "Free Quantity" => ValueType::Integer,
        "MRP" | "PTR" | "PTS" | "Rate" | "Amount" | "GST" | "Discount" => ValueType::Decimal,
        _ => ValueType::Unknown,
    }
}

pub fn is_header_keyword(token: &str) -> bool {
    HEADER_KEYWORDS.contains(&token)
}

/// Whether a (canonical) header is a domain-priority header, case-insensitively.
pub fn is_domain_priority(header: &str) -> bool {
    let lower = header.trim().to_lowercase();
    !lower.is_empty() && DOMAIN_PRIORITY_HEADERS.contains(&lower.as_str())
}

/// Keyword hits in a row of tokens: a token counts once when it is a keyword,
/// contains one, or is contained in one.
pub fn keyword_hits<'a>(tokens: impl IntoIterator<Item = &'a str>) -> usize {
    tokens
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| {
            is_header_keyword(t)
                || HEADER_KEYWORDS
                    .iter()
                    .any(|kw| t.contains(kw) || kw.contains(t.as_str()))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_types_by_canonical_name() {
        assert_eq!(expected_type("Expiry Date"), ValueType::Date);
        assert_eq!(expected_type("Batch No"), ValueType::Alphanumeric);
        assert_eq!(expected_type("Quantity"), ValueType::Integer);
        assert_eq!(expected_type("MRP"), ValueType::Decimal);
        assert_eq!(expected_type("Pack"), ValueType::Text);
        assert_eq!(expected_type("Cl Qty"), ValueType::Unknown);
    }

    #[test]
    fn keyword_hits_exact_and_substring() {
        assert_eq!(keyword_hits(["Product", "Qty", "Xyz"]), 2);
        // "clqty" is a keyword, "ClQty." contains one.
        assert_eq!(keyword_hits(["ClQty."]), 1);
        assert_eq!(keyword_hits(["", "  "]), 0);
    }

    #[test]
    fn domain_priority_is_case_insensitive() {
        assert!(is_domain_priority("Batch No"));
        assert!(is_domain_priority(" MRP "));
        assert!(!is_domain_priority("Scheme"));
        assert!(!is_domain_priority(""));
    }
}
