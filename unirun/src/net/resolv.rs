//! Host resolver configuration (`resolv.conf`).
//!
//! Parsing never fails: an unreadable file yields the defaults with
//! `open_error` set, and unknown directives or options only raise
//! `unknown_option_seen`. See resolv.conf(5).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::IpAddr;
use std::path::Path;

/// Standard resolver limit on name servers.
pub const MAX_NAMESERVERS: usize = 3;

/// Upper bound for parsed decimals; large enough for any option value.
pub const DECIMAL_BOUND: i64 = 0xFF_FFFF;

/// Parsed resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Name server IP literals, in file order (at most three)
    pub servers: Vec<String>,
    /// Search suffixes from the last `search` or `domain` line
    pub search: Vec<String>,
    /// Dots in a name before it is tried as absolute first
    pub ndots: u32,
    /// Seconds before giving up on a query
    pub timeout: u32,
    /// Tries per server
    pub attempts: u32,
    /// Round-robin among servers
    pub rotate: bool,
    /// Something unrecognized was seen
    pub unknown_option_seen: bool,
    /// Database lookup order (`lookup` directive)
    pub lookup_order: Vec<String>,
    /// Why the file could not be opened, if it could not
    pub open_error: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            search: Vec::new(),
            ndots: 1,
            timeout: 5,
            attempts: 2,
            rotate: false,
            unknown_option_seen: false,
            lookup_order: Vec::new(),
            open_error: None,
        }
    }
}

impl ResolverConfig {
    /// Read and parse the resolver file at `path`.
    pub fn parse(path: &Path) -> Self {
        match File::open(path) {
            Ok(file) => Self::from_reader(BufReader::new(file)),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "Resolver configuration unavailable, using defaults"
                );
                Self {
                    open_error: Some(e.to_string()),
                    ..Self::default()
                }
            }
        }
    }

    /// Parse resolver configuration text.
    ///
    /// A read error ends parsing; whatever was read so far is kept.
    pub fn from_reader<R: BufRead>(reader: R) -> Self {
        let mut conf = Self::default();

        for line in reader.split(b'\n') {
            let Ok(line) = line else {
                break;
            };
            conf.apply_line(&String::from_utf8_lossy(&line));
        }

        conf
    }

    fn apply_line(&mut self, line: &str) {
        if line.starts_with(';') || line.starts_with('#') {
            return;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some((&directive, args)) = fields.split_first() else {
            return;
        };

        match directive {
            "nameserver" => {
                // Only literal addresses; a name would need DNS to resolve.
                if let Some(&server) = args.first()
                    && self.servers.len() < MAX_NAMESERVERS
                    && server.parse::<IpAddr>().is_ok()
                {
                    self.servers.push(server.to_string());
                }
            }
            "domain" => {
                if let Some(&domain) = args.first() {
                    self.search = vec![domain.to_string()];
                }
            }
            "search" => {
                self.search = args.iter().map(|s| s.to_string()).collect();
            }
            "options" => {
                for option in args {
                    self.apply_option(option);
                }
            }
            "lookup" => {
                self.lookup_order = args.iter().map(|s| s.to_string()).collect();
            }
            _ => self.unknown_option_seen = true,
        }
    }

    fn apply_option(&mut self, option: &str) {
        if let Some(value) = option.strip_prefix("ndots:") {
            set_clamped(&mut self.ndots, value);
        } else if let Some(value) = option.strip_prefix("timeout:") {
            set_clamped(&mut self.timeout, value);
        } else if let Some(value) = option.strip_prefix("attempts:") {
            set_clamped(&mut self.attempts, value);
        } else if option == "rotate" {
            self.rotate = true;
        } else {
            self.unknown_option_seen = true;
        }
    }
}

/// Store `value` clamped to at least 1; a malformed value leaves `field` alone.
fn set_clamped(field: &mut u32, value: &str) {
    let (n, _, ok) = dtoi(value, 0);
    if ok {
        *field = n.max(1) as u32;
    }
}

/// Decimal to integer starting at `s[start..]`.
///
/// Accepts an optional leading `-` followed by ASCII digits. Returns the
/// value, the offset just past the consumed characters, and whether any
/// digits were consumed. On overflow the magnitude is clamped to
/// [`DECIMAL_BOUND`] and scanning stops at the digit that crossed it.
pub fn dtoi(s: &str, start: usize) -> (i64, usize, bool) {
    let bytes = s.as_bytes();
    let mut i = start;

    let negative = bytes.get(i) == Some(&b'-');
    if negative {
        i += 1;
    }
    let digits_start = i;

    let mut n: i64 = 0;
    while let Some(&b) = bytes.get(i)
        && b.is_ascii_digit()
    {
        n = n * 10 + i64::from(b - b'0');
        i += 1;
        if n >= DECIMAL_BOUND {
            let n = if negative { -DECIMAL_BOUND } else { DECIMAL_BOUND };
            return (n, i, true);
        }
    }

    if i == digits_start {
        return (0, start, false);
    }

    (if negative { -n } else { n }, i, true)
}
