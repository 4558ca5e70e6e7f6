use super::*;

fn strings(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| (*f).to_owned()).collect()
}

fn header() -> ColumnMap {
    ColumnMap::from_header(&strings(&[
        "ID",
        " Title ",
        "Description",
        "Sale_Price",
        "Price",
        "Link",
        "Image_Link",
        "Store",
        "Category",
        "Brand",
    ]))
}

fn rules() -> NormalizeRules {
    NormalizeRules {
        max_id_len: 25,
        description_budget: 20,
        min_field_ratio: 0.5,
    }
}

// -----------------------------------------------------------------------
// ColumnMap
// -----------------------------------------------------------------------

#[test]
fn column_lookup_is_case_insensitive_and_trimmed() {
    let columns = header();
    assert_eq!(columns.position("title"), Some(1));
    assert_eq!(columns.position(" SALE_PRICE "), Some(3));
    assert_eq!(columns.position("missing"), None);
    assert_eq!(columns.headers()[1], "Title");
}

#[test]
fn repeated_header_keeps_first_column() {
    let columns = ColumnMap::from_header(&strings(&["id", "name", "ID"]));
    assert_eq!(columns.position("id"), Some(0));
    assert_eq!(columns.width(), 3);
}

#[test]
fn resolve_falls_back_to_next_alias_when_empty() {
    let columns = header();
    let row = strings(&["A1", "Shoe", "", "  ", "89.90", "", "", "", "", ""]);
    assert_eq!(columns.resolve(&row, PRICE_ALIASES), "89.90");
}

#[test]
fn resolve_prefers_sale_price() {
    let columns = header();
    let row = strings(&["A1", "Shoe", "", "79.90", "89.90", "", "", "", "", ""]);
    assert_eq!(columns.resolve(&row, PRICE_ALIASES), "79.90");
}

#[test]
fn resolve_missing_everywhere_is_empty() {
    let columns = header();
    let row = strings(&["A1"]);
    assert_eq!(columns.resolve(&row, BRAND_ALIASES), "");
}

// -----------------------------------------------------------------------
// validate_id / truncate_description
// -----------------------------------------------------------------------

#[test]
fn validate_id_accepts_plain_ids() {
    assert_eq!(validate_id("MLB-123456", 25), Ok(()));
}

#[test]
fn validate_id_rejects_empty() {
    assert_eq!(validate_id("", 25), Err(Rejection::MissingId));
}

#[test]
fn validate_id_rejects_spaces_and_overlong() {
    assert!(matches!(
        validate_id("leaked description text", 25),
        Err(Rejection::MalformedId { .. })
    ));
    assert!(matches!(
        validate_id("tab\tinside", 25),
        Err(Rejection::MalformedId { .. })
    ));
    assert!(matches!(
        validate_id(&"x".repeat(26), 25),
        Err(Rejection::MalformedId { .. })
    ));
    assert_eq!(validate_id(&"x".repeat(25), 25), Ok(()));
}

#[test]
fn truncate_description_keeps_short_text() {
    assert_eq!(truncate_description("short", 20), "short");
    assert_eq!(truncate_description("exactly5", 8), "exactly5");
}

#[test]
fn truncate_description_appends_marker() {
    assert_eq!(
        truncate_description("A very long description indeed", 6),
        "A very..."
    );
}

#[test]
fn truncate_description_is_idempotent() {
    let long = format!("{} {}", "a".repeat(99), "b".repeat(10));
    let once = truncate_description(&long, 100);
    assert_eq!(once, format!("{}{TRUNCATION_MARKER}", "a".repeat(99)));
    assert_eq!(truncate_description(&once, 100), once);

    let cut = truncate_description("A very long description indeed", 6);
    assert_eq!(truncate_description(&cut, 6), cut);
}

#[test]
fn truncate_description_still_cuts_long_text_ending_in_marker() {
    assert_eq!(truncate_description("abcdefghij...", 4), "abcd...");
}

#[test]
fn truncate_description_counts_characters_not_bytes() {
    assert_eq!(truncate_description("ação rápida", 4), "ação...");
}

// -----------------------------------------------------------------------
// normalize_row
// -----------------------------------------------------------------------

#[test]
fn normalize_row_maps_every_field() {
    let row = strings(&[
        "A1",
        "Trail Runner",
        "Light",
        "",
        "199.90",
        "https://shop.example.com/a1",
        "https://cdn.example.com/a1.jpg",
        "Acme",
        "Shoes, Sports",
        "Stride",
    ]);
    let product = normalize_row(&row, &header(), &rules()).expect("valid row");
    assert_eq!(product.id, "A1");
    assert_eq!(product.name, "Trail Runner");
    assert_eq!(product.description, "Light");
    assert_eq!(product.price, "199.90");
    assert_eq!(product.affiliate_link, "https://shop.example.com/a1");
    assert_eq!(product.image_url, "https://cdn.example.com/a1.jpg");
    assert_eq!(product.store, "Acme");
    assert_eq!(product.category, "Shoes, Sports");
    assert_eq!(product.brand, "Stride");
    assert_eq!(product.social_link, None);
    assert_eq!(product.button_text, "Buy at Store: Acme");
}

#[test]
fn normalize_row_defaults_store_label() {
    let row = strings(&["A1", "Shoe", "", "", "10", "", "", "", "", ""]);
    let product = normalize_row(&row, &header(), &rules()).expect("valid row");
    assert_eq!(product.store, DEFAULT_STORE_LABEL);
    assert_eq!(product.button_text, Product::button_text_for(DEFAULT_STORE_LABEL));
}

#[test]
fn normalize_row_rejects_shredded_rows_before_checking_id() {
    let row = strings(&["has spaces", "x", "y", "z"]);
    let err = normalize_row(&row, &header(), &rules()).unwrap_err();
    assert_eq!(
        err,
        Rejection::ShortRow {
            fields: 4,
            expected_min: 5
        }
    );
}

#[test]
fn normalize_row_rejects_leaked_description_in_id() {
    let row = strings(&["and it continues here", "x", "y", "z", "w", ""]);
    let err = normalize_row(&row, &header(), &rules()).unwrap_err();
    assert!(matches!(err, Rejection::MalformedId { .. }), "{err:?}");
}

#[test]
fn normalize_row_truncates_description() {
    let row = strings(&[
        "A1",
        "Shoe",
        "This description is far longer than the budget",
        "",
        "10",
        "",
        "",
        "",
        "",
        "",
    ]);
    let product = normalize_row(&row, &header(), &rules()).expect("valid row");
    assert!(product.description.ends_with(TRUNCATION_MARKER));
    assert!(product.description.chars().count() <= 20 + TRUNCATION_MARKER.len());
}

// -----------------------------------------------------------------------
// normalize_compact
// -----------------------------------------------------------------------

#[test]
fn normalize_compact_reads_positional_schema() {
    let cells = strings(&[
        "B7",
        "Kettle",
        "59.00",
        "https://cdn.example.com/b7.jpg",
        "https://shop.example.com/b7",
        "HomeCo",
        "Kitchen",
        "Boil",
        "Steel kettle",
        "https://social.example.com/b7",
    ]);
    let product = normalize_compact(&cells, &rules()).expect("valid record");
    assert_eq!(product.id, "B7");
    assert_eq!(product.price, "59.00");
    assert_eq!(product.image_url, "https://cdn.example.com/b7.jpg");
    assert_eq!(product.affiliate_link, "https://shop.example.com/b7");
    assert_eq!(product.store, "HomeCo");
    assert_eq!(
        product.social_link.as_deref(),
        Some("https://social.example.com/b7")
    );
}

#[test]
fn normalize_compact_tolerates_short_records() {
    let product = normalize_compact(&strings(&["B7", "Kettle"]), &rules()).expect("valid");
    assert_eq!(product.name, "Kettle");
    assert_eq!(product.store, DEFAULT_STORE_LABEL);
    assert_eq!(product.description, "");
}

#[test]
fn normalize_compact_validates_id() {
    assert_eq!(
        normalize_compact(&strings(&["", "Kettle"]), &rules()),
        Err(Rejection::MissingId)
    );
}

// -----------------------------------------------------------------------
// ingest
// -----------------------------------------------------------------------

#[test]
fn ingest_csv_counts_rejections_and_keeps_headers() {
    let text = "id,name,price,store\n\
                A1,Shoe,10,Acme\n\
                ,Nameless,5,Acme\n\
                bad id,Broken,5,Acme\n\
                A2\n\
                A3,\"Boot, tall\",12,Zeta\n";
    let report = ingest_csv(text, &rules());
    assert_eq!(report.rows_seen, 5);
    assert_eq!(report.table.len(), 2);
    assert_eq!(
        report.rejected,
        RejectionCounts {
            short_rows: 1,
            missing_id: 1,
            malformed_id: 1,
        }
    );
    assert_eq!(report.rejected.total(), 3);
    assert_eq!(report.table.headers(), ["id", "name", "price", "store"]);
    assert_eq!(
        report.table.get("A3").map(|p| p.name.as_str()),
        Some("Boot, tall")
    );
}

#[test]
fn ingest_csv_survives_embedded_newlines() {
    let text = "id,name,description\nA1,Shoe,\"two\nlines\"\nA2,Boot,plain\n";
    let report = ingest_csv(text, &rules());
    assert_eq!(report.table.len(), 2);
    assert_eq!(report.rejected.total(), 0);
}

#[test]
fn ingest_csv_empty_document() {
    let report = ingest_csv("", &rules());
    assert!(report.table.is_empty());
    assert_eq!(report.rows_seen, 0);
}

#[test]
fn ingest_compact_has_no_headers() {
    let records = vec![strings(&["A1", "Shoe"]), strings(&["bad id", "x"])];
    let report = ingest_compact(records, &rules());
    assert_eq!(report.table.len(), 1);
    assert_eq!(report.rejected.malformed_id, 1);
    assert!(report.table.headers().is_empty());
}
