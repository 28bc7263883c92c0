use crate::encoding;
use crate::error::RowError;
use catalog_types::price_list::Tier;
use indexmap::IndexMap;
use lazy_regex::regex;
use rust_decimal::Decimal;

pub const TIER_COUNT: usize = 5;

const TIER_COLUMNS: [(&str, &str); TIER_COUNT] = [
    ("unit_1", "price_1"),
    ("unit_2", "price_2"),
    ("unit_3", "price_3"),
    ("unit_4", "price_4"),
    ("unit_5", "price_5"),
];

/// Header spellings in supplier feeds that do not reduce to a canonical name.
const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("unique_articlenumber_sku", "sku"),
    ("articlenumber", "sku"),
    ("title", "product_title"),
    ("brand", "brand_name"),
    ("weight", "weight_kg"),
];

/// Maps a feed header to its canonical column name:
/// `"weight (kg)"` becomes `weight_kg`, `"variation_Title"` becomes `variation_title`.
pub fn canonical_column(header: &str) -> String {
    let lower = header.trim().to_lowercase();
    let column = regex!(r"[^a-z0-9]+").replace_all(&lower, "_");
    let column = column.trim_matches('_');
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == column)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| column.to_string())
}

/// One feed line: canonical column name to raw field bytes, in feed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRow {
    fields: IndexMap<String, Vec<u8>>,
}

impl ImportRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: AsRef<str>, V: Into<Vec<u8>>>(&mut self, column: K, value: V) {
        self.fields
            .insert(canonical_column(column.as_ref()), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&[u8]> {
        self.fields.get(column).map(Vec::as_slice)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_blank(&self) -> bool {
        self.fields
            .values()
            .all(|v| v.iter().all(u8::is_ascii_whitespace))
    }
}

impl<K: AsRef<str>, V: Into<Vec<u8>>> FromIterator<(K, V)> for ImportRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = ImportRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Nullable attribute reference column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeField {
    /// Column not in the feed: keep the current reference.
    Absent,
    /// Column present but empty: clear the reference.
    Empty,
    Value(String),
}

impl AttributeField {
    pub fn value(&self) -> Option<&str> {
        match self {
            AttributeField::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Reads normalized, trimmed fields from a row and counts encoding repairs.
pub struct FieldReader<'a> {
    row: &'a ImportRow,
    repaired: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(row: &'a ImportRow) -> Self {
        Self { row, repaired: 0 }
    }

    pub fn repaired(&self) -> usize {
        self.repaired
    }

    /// `None` for a missing or blank column.
    pub fn text(&mut self, column: &str) -> Option<String> {
        let raw = self.row.get(column)?;
        let normalized = encoding::normalize(raw);
        if normalized.repaired() {
            log::warn!(
                "Column {column} decoded from {}{}",
                normalized.source.name(),
                if normalized.lossy { " with replacements" } else { "" }
            );
            self.repaired += 1;
        }
        let text = normalized.text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    pub fn required(&mut self, column: &'static str) -> Result<String, RowError> {
        self.text(column)
            .ok_or(RowError::MissingIdentifyingField { field: column })
    }

    pub fn decimal(&mut self, column: &'static str) -> Result<Option<Decimal>, RowError> {
        match self.text(column) {
            None => Ok(None),
            Some(value) => match parse_decimal(&value) {
                Some(d) => Ok(Some(d)),
                None => Err(RowError::InvalidField {
                    field: column,
                    value,
                }),
            },
        }
    }

    /// Like `decimal`, but an unparsable value is dropped with a warning
    /// instead of rejecting the row.
    pub fn lenient_decimal(&mut self, column: &str) -> Option<Decimal> {
        let value = self.text(column)?;
        let parsed = parse_decimal(&value);
        if parsed.is_none() {
            log::warn!("Ignoring non-numeric {column} {value:?}");
        }
        parsed
    }

    pub fn attribute(&mut self, column: &str) -> AttributeField {
        if !self.row.contains(column) {
            return AttributeField::Absent;
        }
        match self.text(column) {
            Some(v) => AttributeField::Value(v),
            None => AttributeField::Empty,
        }
    }

    fn tiers(&mut self) -> Result<[Option<Tier>; TIER_COUNT], RowError> {
        let mut tiers = [None; TIER_COUNT];
        for (slot, (unit, price)) in tiers.iter_mut().zip(TIER_COLUMNS) {
            *slot = match (self.decimal(unit)?, self.decimal(price)?) {
                (Some(quantity), Some(amount)) if quantity > Decimal::ZERO => {
                    Some(Tier::new(quantity, amount))
                }
                (Some(quantity), Some(_)) => {
                    return Err(RowError::InvalidField {
                        field: unit,
                        value: quantity.to_string(),
                    })
                }
                (None, None) => None,
                (q, p) => {
                    log::warn!("Skipping half-filled tier {unit}={q:?} {price}={p:?}");
                    None
                }
            };
        }
        Ok(tiers)
    }
}

/// Accepts both `19.99` and `19,99`; the right-most separator is the decimal one.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let s = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s,
    };
    s.parse::<Decimal>().ok()
}

/// Typed view of a catalog feed row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowData {
    pub custom_product_id: String,
    pub sku: String,
    pub product_title: Option<String>,
    pub variation_title: Option<String>,
    pub brand: Option<String>,
    /// `sub_category`, or `category` when the feed has no sub category.
    pub category: Option<String>,
    pub article_group: Option<String>,
    pub merchandise_group: Option<String>,
    pub guise: Option<String>,
    pub weight: Option<Decimal>,
    pub customs_tariff_number: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<Decimal>,
    pub color: AttributeField,
    pub format: AttributeField,
    pub material: AttributeField,
    pub tiers: [Option<Tier>; TIER_COUNT],
    pub encoding_repairs: usize,
}

impl RowData {
    pub fn parse(row: &ImportRow) -> Result<Self, RowError> {
        let mut r = FieldReader::new(row);
        let custom_product_id = r.required("custom_product_id")?;
        let sku = r.required("sku")?;
        let category = match r.text("sub_category") {
            Some(sub) => Some(sub),
            None => r.text("category"),
        };
        let mut data = RowData {
            custom_product_id,
            sku,
            product_title: r.text("product_title"),
            variation_title: r.text("variation_title"),
            brand: r.text("brand_name"),
            category,
            article_group: r.text("article_group"),
            merchandise_group: r.text("merchandise_group"),
            guise: r.text("guise"),
            weight: r.lenient_decimal("weight_kg"),
            customs_tariff_number: r.text("customs_tariff_number"),
            price: r.decimal("price")?,
            stock: r.lenient_decimal("stock"),
            color: r.attribute("color"),
            format: r.attribute("format"),
            material: r.attribute("material_thickness"),
            tiers: r.tiers()?,
            encoding_repairs: 0,
        };
        data.encoding_repairs = r.repaired();
        Ok(data)
    }

    pub fn in_stock(&self) -> bool {
        self.stock.is_some_and(|s| s > Decimal::ZERO)
    }

    pub fn present_tiers(&self) -> impl Iterator<Item = &Tier> {
        self.tiers.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lamp() -> ImportRow {
        [
            ("custom_product_id", "P100"),
            ("sku", "P100-RED"),
            ("product_title", "Lamp"),
            ("color", "Red"),
            ("price", "19.99"),
            ("unit_1", "1"),
            ("price_1", "19.99"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn canonical_column_handles_feed_headers() {
        assert_eq!(canonical_column("weight (kg)"), "weight_kg");
        assert_eq!(canonical_column("variation_Title"), "variation_title");
        assert_eq!(canonical_column(" Custom Product ID "), "custom_product_id");
        assert_eq!(canonical_column("unique Articlenumber ( SKU )"), "sku");
        assert_eq!(canonical_column("sub_category"), "sub_category");
        assert_eq!(canonical_column("price_1"), "price_1");
    }

    #[test]
    fn import_row_canonicalizes_on_insert() {
        let mut row = ImportRow::new();
        row.insert("Custom Product ID", "P1");
        row.insert("weight (kg)", "2,5");
        assert_eq!(row.get("custom_product_id"), Some(&b"P1"[..]));
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            vec!["custom_product_id", "weight_kg"]
        );
        assert!(!row.is_blank());
        assert!([("sku", " "), ("price", "")]
            .into_iter()
            .collect::<ImportRow>()
            .is_blank());
    }

    #[test]
    fn parse_decimal_accepts_both_separators() {
        assert_eq!(parse_decimal("19.99"), Some(dec!(19.99)));
        assert_eq!(parse_decimal("19,99"), Some(dec!(19.99)));
        assert_eq!(parse_decimal("1.234,50"), Some(dec!(1234.50)));
        assert_eq!(parse_decimal("1,234.50"), Some(dec!(1234.50)));
        assert_eq!(parse_decimal(" 10 "), Some(dec!(10)));
        assert_eq!(parse_decimal("ten"), None);
    }

    #[test]
    fn parses_lamp_row() {
        let data = RowData::parse(&lamp()).unwrap();
        assert_eq!(data.custom_product_id, "P100");
        assert_eq!(data.sku, "P100-RED");
        assert_eq!(data.product_title.as_deref(), Some("Lamp"));
        assert_eq!(data.color, AttributeField::Value("Red".to_string()));
        assert_eq!(data.format, AttributeField::Absent);
        assert_eq!(data.price, Some(dec!(19.99)));
        assert_eq!(data.tiers[0], Some(Tier::new(dec!(1), dec!(19.99))));
        assert!(data.tiers[1..].iter().all(Option::is_none));
        assert_eq!(data.present_tiers().count(), 1);
        assert!(!data.in_stock());
        assert_eq!(data.encoding_repairs, 0);
    }

    #[test]
    fn missing_identifying_fields_reject_row() {
        let mut row = lamp();
        row.insert("sku", "   ");
        assert!(matches!(
            RowData::parse(&row),
            Err(RowError::MissingIdentifyingField { field: "sku" })
        ));
        let mut row = lamp();
        row.insert("custom_product_id", "");
        assert!(matches!(
            RowData::parse(&row),
            Err(RowError::MissingIdentifyingField {
                field: "custom_product_id"
            })
        ));
    }

    #[test]
    fn malformed_numbers_reject_row() {
        let mut row = lamp();
        row.insert("price", "19.99 EUR");
        assert!(matches!(
            RowData::parse(&row),
            Err(RowError::InvalidField { field: "price", .. })
        ));
        let mut row = lamp();
        row.insert("unit_2", "0");
        row.insert("price_2", "10");
        assert!(matches!(
            RowData::parse(&row),
            Err(RowError::InvalidField { field: "unit_2", .. })
        ));
    }

    #[test]
    fn non_numeric_stock_and_weight_degrade() {
        let mut row = lamp();
        row.insert("stock", "n/a");
        row.insert("weight_kg", "ca. 2");
        let data = RowData::parse(&row).unwrap();
        assert_eq!(data.stock, None);
        assert_eq!(data.weight, None);
        assert!(!data.in_stock());
    }

    #[test]
    fn half_filled_tier_is_skipped() {
        let mut row = lamp();
        row.insert("unit_2", "10");
        row.insert("price_2", "");
        row.insert("unit_3", "50");
        row.insert("price_3", "15.00");
        let data = RowData::parse(&row).unwrap();
        assert_eq!(data.tiers[1], None);
        assert_eq!(data.tiers[2], Some(Tier::new(dec!(50), dec!(15))));
    }

    #[test]
    fn empty_attribute_column_is_explicit() {
        let mut row = lamp();
        row.insert("color", "");
        row.insert("format", "A4");
        let data = RowData::parse(&row).unwrap();
        assert_eq!(data.color, AttributeField::Empty);
        assert_eq!(data.format.value(), Some("A4"));
        assert_eq!(data.material, AttributeField::Absent);
    }

    #[test]
    fn category_prefers_sub_category() {
        let mut row = lamp();
        row.insert("category", "Lighting");
        assert_eq!(RowData::parse(&row).unwrap().category.as_deref(), Some("Lighting"));
        row.insert("sub_category", "Desk lamps");
        assert_eq!(
            RowData::parse(&row).unwrap().category.as_deref(),
            Some("Desk lamps")
        );
    }

    #[test]
    fn legacy_encoded_fields_are_counted() {
        let mut row = lamp();
        row.insert("product_title", &b"Lampe \x8eluta"[..]);
        row.insert("stock", "3");
        let data = RowData::parse(&row).unwrap();
        assert_eq!(data.product_title.as_deref(), Some("Lampe Žluta"));
        assert_eq!(data.encoding_repairs, 1);
        assert!(data.in_stock());
    }
}
