pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn column_ref(alias: &str, column: &str) -> String {
    format!("{}.{}", alias, quote_ident(column))
}

/// Lowercase hex rendering of an identifier blob, for places that cannot carry
/// blobs (JSON documents). `hex(NULL)` is the empty string, so NULL is kept
/// explicitly.
pub fn hex_expr(expr: &str) -> String {
    format!("CASE WHEN {c} IS NULL THEN NULL ELSE lower(hex({c})) END", c = expr)
}

/// Column constraint keeping identifier blobs at the fixed wire width.
pub fn wire_width_check(column: &str) -> String {
    format!("CHECK (length({}) = {})", quote_ident(column), crate::codec::WIRE_LEN)
}
