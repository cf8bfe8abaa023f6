//! Text rendering of PostgreSQL binary values that have no native `Value`
//! counterpart.
//!
//! Output follows the server's own text output for these types (UTC for
//! `timestamptz`), so a `String` field receives what `psql` would print.

use std::fmt::Write;

/// Microseconds per day.
const DAY_MICROS: i64 = 86_400_000_000;
/// Days from 1970-01-01 to the PostgreSQL epoch, 2000-01-01.
const PG_EPOCH_DAYS: i64 = 10_957;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Whether `type_name` is rendered by [`render`].
pub(crate) fn renders(type_name: &str) -> bool {
    matches!(
        type_name,
        "NUMERIC" | "TIMESTAMP" | "TIMESTAMPTZ" | "DATE" | "TIME" | "UUID" | "JSON" | "JSONB"
    )
}

/// Renders the binary wire form of a value of type `type_name` as text.
pub(crate) fn render(type_name: &str, bytes: &[u8]) -> Result<String, String> {
    let mut reader = Reader { bytes };
    let text = match type_name {
        "NUMERIC" => numeric(&mut reader)?,
        "TIMESTAMP" => timestamp(reader.i64()?),
        "TIMESTAMPTZ" => {
            let micros = reader.i64()?;
            let mut text = timestamp(micros);
            if micros != i64::MAX && micros != i64::MIN {
                text.push_str("+00");
            }
            text
        }
        "DATE" => date(reader.i32()?),
        "TIME" => time_of_day(reader.i64()?),
        "UUID" => uuid(reader.take(16)?),
        "JSON" => utf8(reader.rest())?,
        "JSONB" => {
            let version = reader.take(1)?[0];
            if version != 1 {
                return Err(format!("unsupported jsonb version {version}"));
            }
            utf8(reader.rest())?
        }
        other => return Err(format!("no text rendering for type {other}")),
    };

    if !reader.bytes.is_empty() {
        return Err(format!("{} trailing bytes in {type_name} value", reader.bytes.len()));
    }
    Ok(text)
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        if self.bytes.len() < n {
            return Err(format!(
                "value truncated: needed {n} bytes, {} left",
                self.bytes.len()
            ));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.bytes)
    }

    fn i16(&mut self) -> Result<i16, String> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    fn u16(&mut self) -> Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn i32(&mut self) -> Result<i32, String> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i64(&mut self) -> Result<i64, String> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(i64::from_be_bytes(buf))
    }
}

fn utf8(bytes: &[u8]) -> Result<String, String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
}

/// Base-10000 digits with a weight (exponent of the first digit) and a
/// display scale.
fn numeric(reader: &mut Reader<'_>) -> Result<String, String> {
    let ndigits = reader.i16()?;
    let weight = i32::from(reader.i16()?);
    let sign = reader.u16()?;
    let dscale = usize::from(reader.u16()?);

    let digits = (0..ndigits)
        .map(|_| reader.i16())
        .collect::<Result<Vec<_>, _>>()?;

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("invalid numeric sign {other:#06x}")),
    }

    let digit_at = |index: i32| -> i16 {
        usize::try_from(index)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for index in 0..=weight {
            let digit = digit_at(index);
            if index == 0 {
                let _ = write!(out, "{digit}");
            } else {
                let _ = write!(out, "{digit:04}");
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 3);
        let groups = dscale.div_ceil(4);
        for group in 0..groups {
            let index = weight + 1 + group as i32;
            let _ = write!(fraction, "{:04}", digit_at(index));
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

/// Proleptic Gregorian date for days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

fn date(days: i32) -> String {
    match days {
        i32::MAX => "infinity".to_string(),
        i32::MIN => "-infinity".to_string(),
        days => format_date(i64::from(days)),
    }
}

fn format_date(pg_days: i64) -> String {
    let (year, month, day) = civil_from_days(pg_days + PG_EPOCH_DAYS);
    format!("{year:04}-{month:02}-{day:02}")
}

fn time_of_day(micros: i64) -> String {
    let seconds = micros / 1_000_000;
    let fraction = micros % 1_000_000;
    let mut out = format!(
        "{:02}:{:02}:{:02}",
        seconds / 3_600,
        (seconds / 60) % 60,
        seconds % 60
    );
    if fraction != 0 {
        let digits = format!("{fraction:06}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

fn timestamp(micros: i64) -> String {
    match micros {
        i64::MAX => "infinity".to_string(),
        i64::MIN => "-infinity".to_string(),
        micros => {
            let days = micros.div_euclid(DAY_MICROS);
            let within_day = micros.rem_euclid(DAY_MICROS);
            format!("{} {}", format_date(days), time_of_day(within_day))
        }
    }
}

fn uuid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(36);
    for (i, byte) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}
