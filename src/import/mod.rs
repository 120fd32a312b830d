//! Semicolon separated city lists for the `import_cities` tool.
//!
//! The header row must name the `name`, `region` and `country` columns
//! (Russian headers are accepted as well). Rows with an empty name or country
//! are skipped, an empty region falls back to the city name.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::database::CityRecord;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read CSV header: {0}")]
    Header(#[from] csv::Error),
    #[error("missing required column(s): {0}")]
    MissingColumns(String),
}

/// Parsed rows plus the number of data rows that were rejected.
#[derive(Debug, Default)]
pub struct CityImport {
    pub cities: Vec<CityRecord>,
    pub skipped: usize,
}

struct Columns {
    name: usize,
    region: usize,
    country: usize,
}

impl Columns {
    fn locate(header: &csv::StringRecord) -> Result<Self, ImportError> {
        let (mut name, mut region, mut country) = (None, None, None);
        for (i, col) in header.iter().enumerate() {
            match col.trim().to_lowercase().as_str() {
                "name" | "город" => name = Some(i),
                "region" | "регион" | "область" => region = Some(i),
                "country" | "страна" => country = Some(i),
                _ => {}
            }
        }

        match (name, region, country) {
            (Some(name), Some(region), Some(country)) => Ok(Self { name, region, country }),
            _ => {
                let missing: Vec<&str> = [("name", name), ("region", region), ("country", country)]
                    .iter()
                    .filter(|(_, idx)| idx.is_none())
                    .map(|(label, _)| *label)
                    .collect();
                Err(ImportError::MissingColumns(missing.join(", ")))
            }
        }
    }

    fn widest(&self) -> usize {
        self.name.max(self.region).max(self.country)
    }
}

pub fn read_cities_file(path: &Path) -> Result<CityImport, ImportError> {
    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.display().to_string(),
        source,
    })?;
    parse_cities(file)
}

pub fn parse_cities<R: Read>(input: R) -> Result<CityImport, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let columns = Columns::locate(reader.headers()?)?;
    let mut import = CityImport::default();

    for (i, row) in reader.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = match row {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping line {}: {}", line, e);
                import.skipped += 1;
                continue;
            }
        };

        if record.len() <= columns.widest() {
            log::warn!("Skipping line {}: not enough fields", line);
            import.skipped += 1;
            continue;
        }

        let name = record[columns.name].trim();
        let region = record[columns.region].trim();
        let country = record[columns.country].trim();

        if name.is_empty() || country.is_empty() {
            log::warn!("Skipping line {}: empty city name or country", line);
            import.skipped += 1;
            continue;
        }

        let region = if region.is_empty() { name } else { region };
        import.cities.push(CityRecord {
            name: name.to_string(),
            region: region.to_string(),
            country: country.to_string(),
        });
    }

    Ok(import)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_russian_headers_and_defaults_region() {
        let csv = "Город;Область;Страна\nКазань;Республика Татарстан;Россия\nНовосибирск;;Россия\n";
        let import = parse_cities(csv.as_bytes()).unwrap();

        assert_eq!(import.skipped, 0);
        assert_eq!(import.cities.len(), 2);
        assert_eq!(import.cities[1].name, "Новосибирск");
        assert_eq!(import.cities[1].region, "Новосибирск");
    }

    #[test]
    fn columns_may_appear_in_any_order() {
        let csv = "country;name;region\nГермания;Berlin;Berlin\n";
        let import = parse_cities(csv.as_bytes()).unwrap();
        assert_eq!(import.cities[0].country, "Германия");
        assert_eq!(import.cities[0].name, "Berlin");
    }

    #[test]
    fn short_and_blank_rows_are_skipped() {
        let csv = "name;region;country\nOnly name\n;Region;Country\nTver;Tverskaya;\nOmsk;Omskaya;Russia\n";
        let import = parse_cities(csv.as_bytes()).unwrap();
        assert_eq!(import.cities.len(), 1);
        assert_eq!(import.skipped, 3);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = parse_cities("name;country\nOmsk;Russia\n".as_bytes()).unwrap_err();
        match err {
            ImportError::MissingColumns(cols) => assert_eq!(cols, "region"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bundled_sample_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/cities.csv");
        let import = read_cities_file(&path).unwrap();
        assert!(!import.cities.is_empty());
        assert!(import.cities.iter().all(|c| !c.region.is_empty()));
    }
}
