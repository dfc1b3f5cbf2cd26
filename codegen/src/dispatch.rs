//! GEMM kernel dispatch table.
//!
//! The table is total over its grid: every `(mr, nr)` it was built from maps
//! to the kernel of that exact shape, and every other pair maps to `None`.
//! The header's `select_ddgemm_kernel` switch is rendered from the same table.

use std::collections::BTreeMap;

use crate::types::Kernel;
use crate::writer::CodeWriter;

/// Name of the generated selection function.
pub const SELECT_FUNCTION: &str = "select_ddgemm_kernel";

/// Name of the generated kernel pointer typedef.
pub const FUNCTION_TYPEDEF: &str = "ddgemm_function";

/// Two-level `mr -> nr -> kernel` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTable {
    rows: BTreeMap<usize, BTreeMap<usize, Kernel>>,
}

impl DispatchTable {
    /// Build a table from tile kernels. Kernels without a tile shape are skipped.
    pub fn new<'a>(kernels: impl IntoIterator<Item = &'a Kernel>) -> Self {
        let mut rows: BTreeMap<usize, BTreeMap<usize, Kernel>> = BTreeMap::new();
        for kernel in kernels {
            if let Some((mr, nr)) = kernel.tile() {
                rows.entry(mr).or_default().insert(nr, kernel.clone());
            }
        }
        Self { rows }
    }

    /// Kernel for an `mr x nr` tile, if one was generated.
    pub fn lookup(&self, mr: usize, nr: usize) -> Option<&Kernel> {
        self.rows.get(&mr)?.get(&nr)
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All `(mr, nr)` keys in ascending order.
    pub fn tiles(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().flat_map(|(&mr, row)| row.keys().map(move |&nr| (mr, nr)))
    }

    /// Emit `select_ddgemm_kernel` as nested switches.
    pub fn render(&self, w: &mut CodeWriter) {
        w.line(format!("static inline {FUNCTION_TYPEDEF} {SELECT_FUNCTION}(size_t mr, size_t nr) {{"));
        w.block(|w| {
            w.line("switch (mr) {");
            w.block(|w| {
                for (mr, row) in &self.rows {
                    w.line(format!("case {mr}:"));
                    w.block(|w| {
                        w.line("switch (nr) {");
                        w.block(|w| {
                            for (nr, kernel) in row {
                                w.line(format!("case {nr}:"));
                                w.indent_line(format!("return {};", kernel.name));
                            }
                            w.line("default:");
                            w.indent_line("return NULL;");
                        });
                        w.line("}");
                    });
                }
                w.line("default:");
                w.indent_line("return NULL;");
            });
            w.line("}");
        });
        w.line("}");
    }
}
