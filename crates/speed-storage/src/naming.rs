/// Insert a `(n)` suffix before the first `.` of a file name.
///
/// `n == 0` leaves the name untouched: `r.xlsx`, `r(1).xlsx`, `r(2).xlsx`.
/// Everything after the first dot is treated as the extension, so
/// `a.tar.gz` becomes `a(1).tar.gz`.
pub fn suffixed(file_name: &str, n: u32) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    match file_name.split_once('.') {
        Some((stem, ext)) => format!("{stem}({n}).{ext}"),
        None => format!("{file_name}({n})"),
    }
}

/// Join a file name onto a storage directory.
pub fn join(base_dir: &str, file_name: &str) -> String {
    format!("{}/{}", base_dir.trim_end_matches('/'), file_name)
}
