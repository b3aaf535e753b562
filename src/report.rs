//! Text reports printed by the `fuser` subcommands.

use std::fmt::Write;

use fuser_ir::{Fusion, print_fusion, print_stmt, simplify_identities, validate};

/// Per-value facts: kind, data type, constness and consumers.
pub fn analyze(fusion: &mut Fusion) -> String {
    let mut out = String::new();
    writeln!(out, "values:").expect("fmt::Write to String never fails");
    let vals: Vec<_> = fusion.vals().collect();
    for val in vals {
        let rendered = print_stmt(fusion, val);
        let data = fusion.val(val);
        let val_type = data.val_type();
        let dtype = data
            .dtype()
            .map_or_else(|| "?".to_owned(), |d| d.to_string());
        let producer = match data.definition() {
            Some(def) => fusion.expr(def).name().to_string(),
            None => "-".to_owned(),
        };
        let constness = if fusion.is_const_scalar(val) {
            "const"
        } else {
            "free"
        };
        let consumers = fusion.uses(val).len();
        writeln!(
            out,
            "  {rendered}: {val_type} {dtype} {constness}, producer {producer}, {consumers} consumer(s)",
        )
        .expect("fmt::Write to String never fails");
    }
    writeln!(out, "tensor use recomputations: {}", fusion.tv_use_resets())
        .expect("fmt::Write to String never fails");
    write!(out, "{}", validate(fusion)).expect("fmt::Write to String never fails");
    out
}

/// The fusion before and after identity folding.
pub fn simplify(fusion: &mut Fusion) -> String {
    let before = print_fusion(fusion);
    let rewrites = simplify_identities(fusion);
    let after = print_fusion(fusion);
    format!("{before}-- {rewrites} rewrite(s) -->\n{after}{}", validate(fusion))
}
