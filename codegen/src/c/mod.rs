//! C and C++ fragments shared by the generators.
//!
//! The generated implementation is C99 against the FP+ headers; the header
//! is includable from C and C++; the unit test is C++ on top of googletest.

pub mod types;

pub use types::{CType, Param, ParamKind, Signature};

use crate::writer::CodeWriter;

/// Storage qualifier for helpers defined inside the implementation.
pub const STATIC_INLINE: &str = "FPPLUS_STATIC_INLINE";

/// Scalar error-free addition: `s = efadd(a, b, &e)` with `s + e == a + b` exactly.
pub const EFADD: &str = "efadd";

/// Scalar error-free addition for `|a| >= |b|` (fast two-sum), used to renormalize.
pub const EFADDORD: &str = "efaddord";

/// Scalar error-free multiplication: `p = efmul(a, b, &e)` with `p + e == a * b` exactly.
pub const EFMUL: &str = "efmul";

pub fn include_system(w: &mut CodeWriter, header: &str) {
    w.line(format!("#include <{header}>"));
}

pub fn include_local(w: &mut CodeWriter, header: &str) {
    w.line(format!("#include \"{header}\""));
}

/// Opening guard of a header usable from C++.
pub fn extern_c_open(w: &mut CodeWriter) {
    w.line("#ifdef __cplusplus");
    w.line("extern \"C\" {");
    w.line("#endif");
}

pub fn extern_c_close(w: &mut CodeWriter) {
    w.line("#ifdef __cplusplus");
    w.line("} /* extern \"C\" */");
    w.line("#endif");
}

pub fn comment(w: &mut CodeWriter, text: &str) {
    w.line(format!("/* {text} */"));
}

/// Includes common to every generated googletest translation unit.
pub fn gtest_prelude(w: &mut CodeWriter, header: &str, tester: &str) {
    include_system(w, "cstddef");
    include_system(w, "cstdlib");
    w.blank();
    include_system(w, "gtest/gtest.h");
    w.blank();
    include_system(w, header);
    w.blank();
    include_local(w, tester);
    w.blank();
}

/// googletest entry point.
pub fn gtest_main(w: &mut CodeWriter) {
    w.line("int main(int argc, char* argv[]) {");
    w.block(|w| {
        w.line("testing::InitGoogleTest(&argc, argv);");
        w.line("return RUN_ALL_TESTS();");
    });
    w.line("}");
}

/// Expression calling `func` with the given arguments.
pub fn call(func: &str, args: &[&str]) -> String {
    format!("{func}({})", args.join(", "))
}
