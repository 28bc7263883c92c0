use crate::encoding::normalize_lossy;
use crate::row::{canonical_column, ImportRow};
use anyhow::Context;
use itertools::Itertools;
use std::path::Path;

/// Reads a feed into rows keyed by canonical column names. Fields stay raw
/// bytes; blank lines are skipped. Short records are padded with empty
/// fields, so every header column is present in every row.
pub fn read_rows<R: std::io::Read>(
    reader: R,
    delimiter: u8,
) -> Result<Vec<ImportRow>, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .byte_headers()
        .context("Unable to read CSV header")?
        .iter()
        .map(|h| canonical_column(&normalize_lossy(h)))
        .collect();
    if let Some(duplicate) = headers.iter().duplicates().next() {
        log::warn!("Column {duplicate} appears more than once, the last one wins");
    }
    let mut rows = Vec::new();
    for (line, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Unable to read CSV record {}", line + 2))?;
        let row: ImportRow = headers
            .iter()
            .zip(record.iter().chain(std::iter::repeat(&b""[..])))
            .map(|(h, v)| (h.as_str(), v))
            .collect();
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

pub fn read_file<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Vec<ImportRow>, anyhow::Error> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Unable to open {}", path.display()))?;
    read_rows(std::io::BufReader::new(file), delimiter)
        .with_context(|| format!("Unable to parse {}", path.display()))
}

/// Splits rows into batches of at most `size` rows.
pub fn into_batches(rows: Vec<ImportRow>, size: usize) -> Vec<Vec<ImportRow>> {
    rows.into_iter()
        .chunks(size.max(1))
        .into_iter()
        .map(|chunk| chunk.collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_feed_with_legacy_headers() {
        let data = "\u{feff}Custom Product ID;unique Articlenumber ( SKU );weight (kg);variation_Title\n\
                    P100;P100-RED;1,5;Lamp red\n\
                    ;;;\n\
                    P200;P200-BLUE;;\n";
        let rows = read_rows(data.as_bytes(), b';').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].columns().collect::<Vec<_>>(),
            vec!["custom_product_id", "sku", "weight_kg", "variation_title"]
        );
        assert_eq!(rows[0].get("weight_kg"), Some(&b"1,5"[..]));
        assert_eq!(rows[1].get("sku"), Some(&b"P200-BLUE"[..]));
    }

    #[test]
    fn keeps_raw_bytes_for_normalization() {
        let mut data = b"custom_product_id,sku,product_title\nP1,S1,Caf".to_vec();
        data.extend_from_slice(b"\xe9\n");
        let rows = read_rows(data.as_slice(), b',').unwrap();
        assert_eq!(rows[0].get("product_title"), Some(&b"Caf\xe9"[..]));
    }

    #[test]
    fn short_records_are_padded() {
        let rows = read_rows("sku,format,material_thickness\nS1,A4\n".as_bytes(), b',').unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("material_thickness"), Some(&b""[..]));
    }

    #[tokio::test]
    async fn short_record_clears_declared_color() -> Result<(), anyhow::Error> {
        use crate::config::ImportConfig;
        use crate::importer::import_batch;
        use crate::store::Catalog;
        use catalog_types::variation::BySku;
        use tokio_util::sync::CancellationToken;

        let mut rows = read_rows(
            "custom_product_id,sku,color\nP1,S1,Red\nP1,S1\n".as_bytes(),
            b',',
        )?;
        let short = rows.split_off(1);
        let catalog = Catalog::sqlite(tokio_rusqlite::Connection::open_in_memory().await?).await?;
        let config = ImportConfig::default();
        let token = CancellationToken::new();

        assert!(import_batch(&catalog, &config, rows, &token).await.is_success());
        let before = catalog.variations.select(&BySku("S1".to_string())).await?.remove(0);
        assert!(before.color.is_some());

        assert!(import_batch(&catalog, &config, short, &token).await.is_success());
        let after = catalog.variations.select(&BySku("S1".to_string())).await?.remove(0);
        assert_eq!(after.color, None);
        Ok(())
    }

    #[tokio::test]
    async fn imports_windows_1252_file() -> Result<(), anyhow::Error> {
        use crate::config::ImportConfig;
        use crate::importer::import_batch;
        use crate::store::Catalog;
        use catalog_types::product::ByCustomId;
        use std::io::Write;
        use tokio_util::sync::CancellationToken;

        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(
            b"Custom Product ID;unique Articlenumber ( SKU );title;price;unit_1;price_1\n\
              P100;P100-RED;Caf\xe9 lamp;19,99;1;19,99\n\
              P100;;Broken;1;;\n",
        )?;
        let rows = read_file(file.path(), b';')?;
        assert_eq!(rows.len(), 2);

        let catalog = Catalog::sqlite(tokio_rusqlite::Connection::open_in_memory().await?).await?;
        let res = import_batch(
            &catalog,
            &ImportConfig::default(),
            rows,
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(res.summary.rows_ok, 1);
        assert_eq!(res.summary.rows_failed, 1);
        assert_eq!(res.summary.encoding_repairs, 1);
        assert_eq!(res.failures()[0].index, 1);

        let products = catalog.products.select(&ByCustomId("P100".to_string())).await?;
        assert_eq!(products[0].title, "Café lamp");
        Ok(())
    }

    #[test]
    fn batches_keep_order() {
        let rows: Vec<ImportRow> = (0..7)
            .map(|n| [("sku", n.to_string())].into_iter().collect())
            .collect();
        let batches = into_batches(rows, 3);
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 1]);
        assert_eq!(batches[2][0].get("sku"), Some(&b"6"[..]));
        assert_eq!(into_batches(Vec::new(), 0).len(), 0);
    }
}
