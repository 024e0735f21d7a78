//! CSV and plain-text export of proxy records

use crate::proxy::models::SharedRecord;
use crate::Result;
use csv::{Terminator, Writer, WriterBuilder};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Byte-order mark so spreadsheet tools detect UTF-8
pub const UTF8_BOM: &str = "\u{FEFF}";

pub const CSV_HEADER: [&str; 4] = ["IP", "Port", "Country", "Company"];

fn csv_writer<W: Write>(out: W) -> Writer<W> {
    WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out)
}

/// Write the BOM, the header and one row per record
pub fn write_csv<W: Write>(records: &[SharedRecord], mut out: W) -> Result<()> {
    out.write_all(UTF8_BOM.as_bytes())?;

    let mut wtr = csv_writer(out);
    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.write_record([
            record.ip.as_str(),
            record.port.as_str(),
            record.country_name.as_str(),
            record.company.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize records as a BOM-prefixed CSV table with a header row
pub fn to_csv(records: &[SharedRecord]) -> Result<String> {
    let mut buf = Vec::with_capacity(UTF8_BOM.len() + 32 + records.len() * 48);
    write_csv(records, &mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// One `ip:port` per line
pub fn to_plain_list(records: &[SharedRecord]) -> String {
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the CSV export to a file
pub fn save_csv<P: AsRef<Path>>(records: &[SharedRecord], path: P) -> Result<()> {
    let file = File::create(path)?;
    write_csv(records, BufWriter::new(file))
}

/// Write the plain `ip:port` list to a file
pub fn save_plain<P: AsRef<Path>>(records: &[SharedRecord], path: P) -> Result<()> {
    fs::write(path, to_plain_list(records))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProxyRecord;
    use std::sync::Arc;

    fn record(ip: &str, port: &str, company: &str) -> SharedRecord {
        Arc::new(ProxyRecord::new(
            ip.to_string(),
            port.to_string(),
            "US".to_string(),
            "美国".to_string(),
            company.to_string(),
        ))
    }

    #[test]
    fn test_csv_header_and_bom() {
        let csv = to_csv(&[]).unwrap();
        assert!(csv.starts_with('\u{FEFF}'));
        assert_eq!(csv, "\u{FEFF}IP,Port,Country,Company\n");
    }

    #[test]
    fn test_csv_rows() {
        let csv = to_csv(&[record("1.2.3.4", "80", "Acme"), record("5.6.7.8", "443", "")]).unwrap();
        let lines: Vec<&str> = csv.trim_start_matches(UTF8_BOM).lines().collect();
        assert_eq!(
            lines,
            vec![
                "IP,Port,Country,Company",
                "1.2.3.4,80,美国,Acme",
                "5.6.7.8,443,美国,未知",
            ]
        );
    }

    #[test]
    fn test_csv_quoting() {
        let csv = to_csv(&[record("1.2.3.4", "80", "Acme, \"Global\" Inc.")]).unwrap();
        assert!(csv.ends_with("1.2.3.4,80,美国,\"Acme, \"\"Global\"\" Inc.\"\n"));

        let csv = to_csv(&[record("1.2.3.4", "80", "Line\nBreak")]).unwrap();
        assert!(csv.ends_with("1.2.3.4,80,美国,\"Line\nBreak\"\n"));
        assert!(!csv.contains('\r'));
    }

    #[test]
    fn test_plain_list() {
        let list = to_plain_list(&[record("1.2.3.4", "80", "A"), record("5.6.7.8", "443", "B")]);
        assert_eq!(list, "1.2.3.4:80\n5.6.7.8:443");
        assert_eq!(to_plain_list(&[]), "");
    }

    #[test]
    fn test_save_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxies.csv");
        save_csv(&[record("1.2.3.4", "80", "Acme")], &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, to_csv(&[record("1.2.3.4", "80", "Acme")]).unwrap());

        let plain = dir.path().join("proxies.txt");
        save_plain(&[record("1.2.3.4", "80", "Acme")], &plain).unwrap();
        assert_eq!(std::fs::read_to_string(&plain).unwrap(), "1.2.3.4:80");
    }
}
