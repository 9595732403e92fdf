/// Puzzle serialization: compact comma-delimited token string.
///
/// ## Format
///
///   `0,<count>,x,y,c,x,y,c,...`
///
///   - `0`      format version
///   - `count`  number of painted cells that follow
///   - `x,y,c`  one triple per painted cell, row-major, in grid units;
///              `c` is the palette index
///
/// An empty grid is `0,0`. The string only contains digits and commas, so
/// it survives being embedded in a URL query (`,` percent-encodes to `%2C`).
///
/// ## Parsing
///
/// Tokens are read left to right by a cursor. The end of input or an empty
/// token ends the cell list early without error; whatever complete triples
/// were read are kept. Anything that *is* present must be valid: a
/// non-numeric token, an unknown version, a cell outside the grid or a
/// color outside the palette rejects the whole load (`MalformedInput`).
///
/// ## Sharing
///
/// `share_url` / `extract_query_param` carry the token string in a
/// `?puzzle=` query parameter. Files hold the bare token string.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::grid::{ColorIndex, Grid};
use crate::domain::palette::Palette;
use crate::error::{EditorError, Result};

pub const FORMAT_VERSION: u32 = 0;
pub const QUERY_PARAM: &str = "puzzle";
const PUZZLE_FILE: &str = "puzzle.txt";

// ══════════════════════════════════════════════════════════════
// Encoding
// ══════════════════════════════════════════════════════════════

pub fn encode_grid(grid: &Grid) -> String {
    let cells: Vec<(usize, usize, ColorIndex)> = grid.painted_cells().collect();
    let mut out = String::with_capacity(8 + cells.len() * 9);
    out.push_str(&format!("{},{}", FORMAT_VERSION, cells.len()));
    for (x, y, c) in cells {
        out.push_str(&format!(",{},{},{}", x, y, c.0));
    }
    out
}

// ══════════════════════════════════════════════════════════════
// Decoding
// ══════════════════════════════════════════════════════════════

/// Left-to-right token cursor.
struct TokenReader<'a> {
    parts: Vec<&'a str>,
    index: usize,
}

impl<'a> TokenReader<'a> {
    fn new(s: &'a str) -> Self {
        TokenReader {
            parts: s.split(',').map(str::trim).collect(),
            index: 0,
        }
    }

    /// Next token, or `None` at end of input or on an empty token.
    fn next_token(&mut self) -> Option<&'a str> {
        let tok = *self.parts.get(self.index)?;
        self.index += 1;
        if tok.is_empty() { None } else { Some(tok) }
    }

    /// Next token parsed as a number. `Ok(None)` means the stream ended.
    fn next_num<T: FromStr>(&mut self, what: &str) -> Result<Option<T>> {
        let Some(tok) = self.next_token() else {
            return Ok(None);
        };
        tok.parse::<T>()
            .map(Some)
            .map_err(|_| EditorError::malformed(format!("{what}: `{tok}` is not a number")))
    }
}

/// Decode into a fresh `width × height` grid.
pub fn decode_grid(s: &str, width: usize, height: usize, palette: &Palette) -> Result<Grid> {
    let mut grid = Grid::new(width, height);
    let mut reader = TokenReader::new(s.trim());

    let Some(version) = reader.next_num::<u32>("version")? else {
        return Ok(grid);
    };
    if version != FORMAT_VERSION {
        return Err(EditorError::malformed(format!("unsupported version {version}")));
    }

    let Some(count) = reader.next_num::<usize>("cell count")? else {
        return Ok(grid);
    };

    for i in 0..count {
        let Some(x) = reader.next_num::<usize>("x")? else { break };
        let Some(y) = reader.next_num::<usize>("y")? else { break };
        let Some(c) = reader.next_num::<u16>("color")? else { break };

        if x >= width || y >= height {
            return Err(EditorError::malformed(format!(
                "cell {i} at ({x}, {y}) is outside the {width}x{height} grid"
            )));
        }
        let color = u8::try_from(c).ok()
            .map(ColorIndex)
            .filter(|c| palette.contains(*c))
            .ok_or_else(|| EditorError::malformed(format!("cell {i} has unknown color {c}")))?;
        grid.set(x, y, Some(color))?;
    }

    Ok(grid)
}

// ══════════════════════════════════════════════════════════════
// URL sharing
// ══════════════════════════════════════════════════════════════

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// Decode `%XX` escapes. Malformed escapes are kept verbatim.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
            if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                let hex = |b: u8| (b as char).to_digit(16).unwrap_or(0) as u8;
                out.push(hex(hi) << 4 | hex(lo));
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// `<base>?puzzle=<token>` (or `&puzzle=` if `base` already has a query).
pub fn share_url(base: &str, token: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base, sep, QUERY_PARAM, percent_encode(token))
}

/// Value of `name` in a URL's query string. `+` decodes to a space.
/// A bare `name` with no `=` yields an empty string.
pub fn extract_query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or("");
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some((key, value)) if key == name => {
                return Some(percent_decode(&value.replace('+', " ")));
            }
            None if pair == name => return Some(String::new()),
            _ => {}
        }
    }
    None
}

/// Accept either a bare token string (possibly percent-encoded) or a full
/// share URL carrying `?puzzle=`.
pub fn decode_puzzle_arg(arg: &str) -> Option<String> {
    let arg = arg.trim();
    if arg.contains('?') {
        extract_query_param(arg, QUERY_PARAM)
    } else {
        Some(percent_decode(arg))
    }
}

// ══════════════════════════════════════════════════════════════
// Files
// ══════════════════════════════════════════════════════════════

/// Writable data directory: exe dir, then `~/.local/share/piecegrid`, then CWD.
pub fn save_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let test_path = parent.join(".write_test_piecegrid");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/piecegrid");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn default_puzzle_path() -> PathBuf {
    save_dir().join(PUZZLE_FILE)
}

pub fn save_file(path: &Path, token: &str) -> Result<()> {
    std::fs::write(path, format!("{token}\n"))?;
    Ok(())
}

pub fn load_file(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;
    use proptest::prelude::*;

    fn decode(s: &str, w: usize, h: usize) -> Result<Grid> {
        decode_grid(s, w, h, &Palette::default())
    }

    #[test]
    fn empty_grid_encodes_to_header() {
        let g = Grid::new(32, 32);
        assert_eq!(encode_grid(&g), "0,0");
        assert_eq!(decode("0,0", 32, 32).unwrap(), g);
    }

    #[test]
    fn encoding_lists_row_major_triples() {
        let g = grid_from(&[
            ".2",
            "3.",
        ]);
        assert_eq!(encode_grid(&g), "0,2,1,0,2,0,1,3");
    }

    #[test]
    fn round_trip_fixtures() {
        let fixtures = [
            grid_from(&["....", "....", "....", "...."]),
            grid_from(&["....", ".7..", "....", "...."]),
            grid_from(&["11..", "11..", "..44", "..44"]),
            grid_from(&["1212", "2121", "1212", "2121"]),
        ];
        for g in fixtures {
            let back = decode(&encode_grid(&g), 4, 4).unwrap();
            assert_eq!(back, g);
        }
    }

    #[test]
    fn checkerboard_stays_sixteen_pieces() {
        let g = grid_from(&["1212", "2121", "1212", "2121"]);
        let back = decode(&encode_grid(&g), 4, 4).unwrap();
        assert_eq!(crate::domain::segment::segment(&back).len(), 16);
    }

    #[test]
    fn lenient_end_of_input() {
        assert!(decode("", 4, 4).unwrap().is_empty());
        assert!(decode("0", 4, 4).unwrap().is_empty());
        assert!(decode("0,", 4, 4).unwrap().is_empty());
        // Count promises 3, stream holds 1 full triple + a partial one.
        let g = decode("0,3,1,1,2,2,2", 4, 4).unwrap();
        assert_eq!(g.painted_count(), 1);
        assert_eq!(g.get(1, 1).unwrap(), Some(ColorIndex(2)));
        // Empty token stops the list.
        let g = decode("0,2,0,0,1,,3,3,1", 4, 4).unwrap();
        assert_eq!(g.painted_count(), 1);
    }

    #[test]
    fn trailing_commas_and_whitespace_are_tolerated() {
        let g = decode(" 0, 1, 2, 3, 4,\n", 4, 4).unwrap();
        assert_eq!(g.get(2, 3).unwrap(), Some(ColorIndex(4)));
    }

    #[test]
    fn non_numeric_rejects_load() {
        assert!(matches!(decode("v0,0", 4, 4), Err(EditorError::MalformedInput(_))));
        assert!(matches!(decode("0,many", 4, 4), Err(EditorError::MalformedInput(_))));
        assert!(matches!(decode("0,1,1,y,2", 4, 4), Err(EditorError::MalformedInput(_))));
        assert!(matches!(decode("0,1,-1,0,2", 4, 4), Err(EditorError::MalformedInput(_))));
    }

    #[test]
    fn out_of_range_rejects_load() {
        assert!(matches!(decode("1,0", 4, 4), Err(EditorError::MalformedInput(_))));
        assert!(matches!(decode("0,1,4,0,1", 4, 4), Err(EditorError::MalformedInput(_))));
        assert!(matches!(decode("0,1,0,4,1", 4, 4), Err(EditorError::MalformedInput(_))));
        assert!(matches!(decode("0,1,0,0,10", 4, 4), Err(EditorError::MalformedInput(_))));
        assert!(matches!(decode("0,1,0,0,999", 4, 4), Err(EditorError::MalformedInput(_))));
    }

    #[test]
    fn later_duplicate_wins() {
        let g = decode("0,2,0,0,1,0,0,5", 4, 4).unwrap();
        assert_eq!(g.get(0, 0).unwrap(), Some(ColorIndex(5)));
    }

    #[test]
    fn percent_round_trip() {
        let token = "0,2,1,0,2,0,1,3";
        assert_eq!(percent_encode(token), "0%2C2%2C1%2C0%2C2%2C0%2C1%2C3");
        assert_eq!(percent_decode(&percent_encode(token)), token);
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz%2c"), "%zz,");
    }

    #[test]
    fn share_url_and_extract() {
        let url = share_url("https://example.invalid/pg/", "0,1,3,4,5");
        assert_eq!(url, "https://example.invalid/pg/?puzzle=0%2C1%2C3%2C4%2C5");
        assert_eq!(extract_query_param(&url, "puzzle").as_deref(), Some("0,1,3,4,5"));

        let url = share_url("https://h/?lang=en", "0,0");
        assert_eq!(url, "https://h/?lang=en&puzzle=0%2C0");
    }

    #[test]
    fn query_param_edge_cases() {
        assert_eq!(extract_query_param("https://h/", "puzzle"), None);
        assert_eq!(extract_query_param("https://h/?other=1", "puzzle"), None);
        assert_eq!(extract_query_param("https://h/?puzzle", "puzzle").as_deref(), Some(""));
        assert_eq!(extract_query_param("https://h/?a=1&puzzle=0,0#frag", "puzzle").as_deref(), Some("0,0"));
        assert_eq!(extract_query_param("https://h/?puzzle=a+b", "puzzle").as_deref(), Some("a b"));
        assert_eq!(extract_query_param("https://h/?xpuzzle=1", "puzzle"), None);
    }

    #[test]
    fn puzzle_arg_forms() {
        assert_eq!(decode_puzzle_arg("0,1,2,3,4").as_deref(), Some("0,1,2,3,4"));
        assert_eq!(decode_puzzle_arg("0%2C0").as_deref(), Some("0,0"));
        assert_eq!(decode_puzzle_arg("https://h/?puzzle=0%2C0").as_deref(), Some("0,0"));
        assert_eq!(decode_puzzle_arg("https://h/?x=1"), None);
    }

    #[test]
    fn file_round_trip() {
        let dir = std::env::temp_dir().join(format!("piecegrid-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("p.txt");
        save_file(&path, "0,1,0,0,1").unwrap();
        assert_eq!(load_file(&path).unwrap(), "0,1,0,0,1");
        let _ = std::fs::remove_dir_all(&dir);
    }

    proptest! {
        #[test]
        fn any_grid_round_trips(cells in proptest::collection::vec(proptest::option::of(0u8..10), 6 * 5)) {
            let mut g = Grid::new(6, 5);
            for (i, c) in cells.into_iter().enumerate() {
                g.set(i % 6, i / 6, c.map(ColorIndex)).unwrap();
            }
            let encoded = encode_grid(&g);
            let via_url = extract_query_param(&share_url("https://h/", &encoded), QUERY_PARAM).unwrap();
            prop_assert_eq!(&via_url, &encoded);
            prop_assert_eq!(decode(&encoded, 6, 5).unwrap(), g);
        }
    }
}
