//! Line parser for proxy feed records
//!
//! Two feed conventions are understood:
//! - `IP,PORT,COUNTRY,COMPANY`
//! - `IP:PORT#COUNTRY#COMPANY`

use crate::proxy::country;
use crate::proxy::models::ProxyRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A first field of the form `host:port` followed by `#`
static HASH_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^#]*:[^#]*#").expect("Invalid hash line regex"));

/// Field delimiter convention of the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineFormat {
    /// Detect per line: hash convention when the first `#` field holds a colon
    #[default]
    Auto,
    Comma,
    Hash,
}

impl fmt::Display for LineFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineFormat::Auto => write!(f, "auto"),
            LineFormat::Comma => write!(f, "comma"),
            LineFormat::Hash => write!(f, "hash"),
        }
    }
}

impl FromStr for LineFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(LineFormat::Auto),
            "comma" => Ok(LineFormat::Comma),
            "hash" => Ok(LineFormat::Hash),
            _ => Err(format!("Invalid line format: {}. Use: auto, comma, hash", s)),
        }
    }
}

/// Reason a line was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    Empty,
    Comment,
    TooFewFields,
    MissingIp,
    MissingPort,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ParseFailure::Empty => "empty line",
            ParseFailure::Comment => "comment line",
            ParseFailure::TooFewFields => "fewer than 2 fields",
            ParseFailure::MissingIp => "missing ip",
            ParseFailure::MissingPort => "missing port",
        };
        f.write_str(reason)
    }
}

/// Parser turning feed lines into proxy records
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser {
    format: LineFormat,
}

impl LineParser {
    pub fn new(format: LineFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> LineFormat {
        self.format
    }

    /// Convention used for a given line
    pub fn detect(&self, line: &str) -> LineFormat {
        match self.format {
            LineFormat::Auto if HASH_LINE_REGEX.is_match(line) => LineFormat::Hash,
            LineFormat::Auto => LineFormat::Comma,
            explicit => explicit,
        }
    }

    /// Parse one line; failures are logged at debug level
    pub fn parse_line(&self, line: &str) -> Result<ProxyRecord, ParseFailure> {
        let result = self.parse_inner(line);
        if let Err(reason) = &result {
            if *reason != ParseFailure::Empty {
                log::debug!("Skipping line {:?}: {}", line, reason);
            }
        }
        result
    }

    fn parse_inner(&self, line: &str) -> Result<ProxyRecord, ParseFailure> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseFailure::Empty);
        }
        if line.starts_with('#') {
            return Err(ParseFailure::Comment);
        }

        let (ip, port, code, company) = match self.detect(line) {
            LineFormat::Hash => Self::split_hash(line)?,
            _ => Self::split_comma(line)?,
        };

        if ip.is_empty() {
            return Err(ParseFailure::MissingIp);
        }
        if port.is_empty() {
            return Err(ParseFailure::MissingPort);
        }

        let country_code = code.to_uppercase();
        let country_name = country::display_name(code);

        Ok(ProxyRecord::new(
            ip.to_string(),
            port.to_string(),
            country_code,
            country_name,
            company.to_string(),
        ))
    }

    /// `ip,port,country,company`; the company keeps any further commas
    fn split_comma(line: &str) -> Result<(&str, &str, &str, &str), ParseFailure> {
        let parts: Vec<&str> = line.splitn(4, ',').map(str::trim).collect();
        if parts.len() < 2 {
            return Err(ParseFailure::TooFewFields);
        }

        Ok((
            parts[0],
            parts[1],
            parts.get(2).copied().unwrap_or(""),
            parts.get(3).copied().unwrap_or(""),
        ))
    }

    /// `ip:port#country#company`; the company keeps any further `#`
    fn split_hash(line: &str) -> Result<(&str, &str, &str, &str), ParseFailure> {
        let parts: Vec<&str> = line.splitn(3, '#').map(str::trim).collect();
        if parts.len() < 2 {
            return Err(ParseFailure::TooFewFields);
        }

        let mut host_port = parts[0].split(':').map(str::trim);
        let ip = host_port.next().unwrap_or("");
        let port = host_port.next().ok_or(ParseFailure::MissingPort)?;

        Ok((ip, port, parts[1], parts.get(2).copied().unwrap_or("")))
    }
}
