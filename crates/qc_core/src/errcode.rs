//! Numeric error codes carried by error values.
//!
//! The numbering follows the calculator's error table so scripts that test
//! `errno()` keep working.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Codes below the calculator base are raw operating system errnos.
    pub const fn is_os(self) -> bool {
        self.0 < E_BASE.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}", self.0)
    }
}

pub const E_BASE: ErrorCode = ErrorCode(10000);

/// Wraps an operating system errno; unknown failures map to `EIO`.
pub fn os_error(err: &std::io::Error) -> ErrorCode {
    match err.raw_os_error() {
        Some(errno) if errno > 0 => ErrorCode(errno as u32),
        _ => ErrorCode(5),
    }
}

pub const E_DIVBYZERO: ErrorCode = ErrorCode(10001);
pub const E_ZERODIVZERO: ErrorCode = ErrorCode(10002);
pub const E_EVAL: ErrorCode = ErrorCode(10049);
pub const E_FPUTC_1: ErrorCode = ErrorCode(10053);
pub const E_FPUTC_2: ErrorCode = ErrorCode(10054);
pub const E_FPUTC_3: ErrorCode = ErrorCode(10055);
pub const E_FGETC_1: ErrorCode = ErrorCode(10056);
pub const E_FGETC_2: ErrorCode = ErrorCode(10057);
pub const E_FOPEN_1: ErrorCode = ErrorCode(10058);
pub const E_FOPEN_2: ErrorCode = ErrorCode(10059);
pub const E_FREOPEN_1: ErrorCode = ErrorCode(10060);
pub const E_FREOPEN_2: ErrorCode = ErrorCode(10061);
pub const E_FREOPEN_3: ErrorCode = ErrorCode(10062);
pub const E_FCLOSE_1: ErrorCode = ErrorCode(10063);
pub const E_FFLUSH: ErrorCode = ErrorCode(10064);
pub const E_FPUTS_1: ErrorCode = ErrorCode(10065);
pub const E_FPUTS_2: ErrorCode = ErrorCode(10066);
pub const E_FPUTS_3: ErrorCode = ErrorCode(10067);
pub const E_FGETS_1: ErrorCode = ErrorCode(10068);
pub const E_FGETS_2: ErrorCode = ErrorCode(10069);
pub const E_FPUTSTR_1: ErrorCode = ErrorCode(10070);
pub const E_FPUTSTR_2: ErrorCode = ErrorCode(10071);
pub const E_FPUTSTR_3: ErrorCode = ErrorCode(10072);
pub const E_FGETSTR_1: ErrorCode = ErrorCode(10073);
pub const E_FGETSTR_2: ErrorCode = ErrorCode(10074);
pub const E_FGETLINE_1: ErrorCode = ErrorCode(10075);
pub const E_FGETLINE_2: ErrorCode = ErrorCode(10076);
pub const E_FGETFIELD_1: ErrorCode = ErrorCode(10077);
pub const E_FGETFIELD_2: ErrorCode = ErrorCode(10078);
pub const E_REWIND_1: ErrorCode = ErrorCode(10079);
pub const E_FILES: ErrorCode = ErrorCode(10080);
pub const E_FTELL_1: ErrorCode = ErrorCode(10102);
pub const E_FTELL_2: ErrorCode = ErrorCode(10103);
pub const E_FSEEK_1: ErrorCode = ErrorCode(10104);
pub const E_FSEEK_2: ErrorCode = ErrorCode(10105);
pub const E_FSEEK_3: ErrorCode = ErrorCode(10106);
pub const E_FSIZE_1: ErrorCode = ErrorCode(10107);
pub const E_FSIZE_2: ErrorCode = ErrorCode(10108);
pub const E_FEOF_1: ErrorCode = ErrorCode(10109);
pub const E_FEOF_2: ErrorCode = ErrorCode(10110);
pub const E_FERROR_1: ErrorCode = ErrorCode(10111);
pub const E_FERROR_2: ErrorCode = ErrorCode(10112);
pub const E_UNGETC_1: ErrorCode = ErrorCode(10113);
pub const E_UNGETC_2: ErrorCode = ErrorCode(10114);
pub const E_UNGETC_3: ErrorCode = ErrorCode(10115);
pub const E_BIGEXP: ErrorCode = ErrorCode(10116);
pub const E_SEARCH_1: ErrorCode = ErrorCode(10121);
pub const E_SEARCH_2: ErrorCode = ErrorCode(10122);
pub const E_SEARCH_3: ErrorCode = ErrorCode(10123);
pub const E_SEARCH_4: ErrorCode = ErrorCode(10124);
pub const E_SEARCH_5: ErrorCode = ErrorCode(10125);
pub const E_SEARCH_6: ErrorCode = ErrorCode(10126);
pub const E_RSEARCH_1: ErrorCode = ErrorCode(10127);
pub const E_RSEARCH_2: ErrorCode = ErrorCode(10128);
pub const E_RSEARCH_3: ErrorCode = ErrorCode(10129);
pub const E_RSEARCH_4: ErrorCode = ErrorCode(10130);
pub const E_RSEARCH_5: ErrorCode = ErrorCode(10131);
pub const E_RSEARCH_6: ErrorCode = ErrorCode(10132);
pub const E_MANYOPEN: ErrorCode = ErrorCode(10133);
pub const E_REWIND_2: ErrorCode = ErrorCode(10134);
pub const E_BLK_1: ErrorCode = ErrorCode(10202);
pub const E_BLK_2: ErrorCode = ErrorCode(10203);
pub const E_BLK_3: ErrorCode = ErrorCode(10204);
pub const E_BLK_4: ErrorCode = ErrorCode(10205);
pub const E_BLKFREE_1: ErrorCode = ErrorCode(10206);
pub const E_BLKFREE_2: ErrorCode = ErrorCode(10207);
pub const E_BLKFREE_3: ErrorCode = ErrorCode(10208);
pub const E_BLKFREE_4: ErrorCode = ErrorCode(10209);
pub const E_BLKFREE_5: ErrorCode = ErrorCode(10210);
pub const E_BLOCKS_1: ErrorCode = ErrorCode(10211);
pub const E_BLOCKS_2: ErrorCode = ErrorCode(10212);
pub const E_COPY_01: ErrorCode = ErrorCode(10213);
pub const E_COPY_02: ErrorCode = ErrorCode(10214);
pub const E_COPY_04: ErrorCode = ErrorCode(10216);
pub const E_COPY_05: ErrorCode = ErrorCode(10217);
pub const E_COPY_06: ErrorCode = ErrorCode(10218);
pub const E_COPY_07: ErrorCode = ErrorCode(10219);
pub const E_COPY_08: ErrorCode = ErrorCode(10220);
pub const E_COPY_09: ErrorCode = ErrorCode(10221);
pub const E_COPY_10: ErrorCode = ErrorCode(10222);
pub const E_COPY_11: ErrorCode = ErrorCode(10223);
pub const E_COPY_12: ErrorCode = ErrorCode(10224);
pub const E_COPY_13: ErrorCode = ErrorCode(10225);
pub const E_COPY_14: ErrorCode = ErrorCode(10226);
pub const E_COPY_15: ErrorCode = ErrorCode(10227);
pub const E_COPY_16: ErrorCode = ErrorCode(10228);
pub const E_COPY_17: ErrorCode = ErrorCode(10229);
pub const E_COPYF_1: ErrorCode = ErrorCode(10230);
pub const E_COPYF_2: ErrorCode = ErrorCode(10231);
pub const E_COPYF_3: ErrorCode = ErrorCode(10232);
pub const E_COPYF_4: ErrorCode = ErrorCode(10233);
pub const E_FPATHOPEN_1: ErrorCode = ErrorCode(10410);
pub const E_FPATHOPEN_2: ErrorCode = ErrorCode(10411);
pub const E_FGETFILE_1: ErrorCode = ErrorCode(10415);
pub const E_FGETFILE_2: ErrorCode = ErrorCode(10416);
pub const E_FGETFILE_3: ErrorCode = ErrorCode(10417);


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_codes_follow_table() {
        assert_eq!(E_COPY_01.get(), 10213);
        assert_eq!(E_COPY_17.get(), 10229);
        assert_eq!(E_COPYF_4.get(), 10233);
    }

    #[test]
    fn os_errors_stay_below_base() {
        let err = std::io::Error::from_raw_os_error(2);
        assert_eq!(os_error(&err), ErrorCode(2));
        assert!(os_error(&err).is_os());
        assert!(!E_MANYOPEN.is_os());
    }
}
