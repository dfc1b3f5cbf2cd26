//! C types and function signatures of the generated kernels.
//!
//! A [`Signature`] is rendered three ways (definition, prototype and
//! function-pointer typedef) so that the implementation, the header and the
//! dispatch table cannot disagree on parameter order or types.

use itertools::Itertools;

/// C types appearing in kernel signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CType {
    Void,
    Size,
    Double,
    /// FP+ `doubledouble` struct (`hi`, `lo`).
    DoubleDouble,
}

impl CType {
    pub fn c_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Size => "size_t",
            Self::Double => "double",
            Self::DoubleDouble => "doubledouble",
        }
    }
}

/// How a parameter is passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// Scalar passed by value.
    Value,
    /// Read-only array of at least `extent` elements.
    Input { extent: String },
    /// Read-write array of at least `extent` elements.
    InOut { extent: String },
}

/// One kernel parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: CType,
    pub name: &'static str,
    pub kind: ParamKind,
}

impl Param {
    pub fn value(ty: CType, name: &'static str) -> Self {
        Self { ty, name, kind: ParamKind::Value }
    }

    pub fn input(ty: CType, name: &'static str, extent: impl Into<String>) -> Self {
        Self { ty, name, kind: ParamKind::Input { extent: extent.into() } }
    }

    pub fn in_out(ty: CType, name: &'static str, extent: impl Into<String>) -> Self {
        Self { ty, name, kind: ParamKind::InOut { extent: extent.into() } }
    }

    fn qualified_type(&self) -> String {
        match self.kind {
            ParamKind::Input { .. } => format!("const {}", self.ty.c_name()),
            ParamKind::Value | ParamKind::InOut { .. } => self.ty.c_name().to_string(),
        }
    }

    /// Definition form, e.g. `const double a[restrict static n]`.
    pub fn definition(&self) -> String {
        match &self.kind {
            ParamKind::Value => format!("{} {}", self.qualified_type(), self.name),
            ParamKind::Input { extent } | ParamKind::InOut { extent } => {
                format!("{} {}[restrict static {extent}]", self.qualified_type(), self.name)
            }
        }
    }

    /// Prototype form, e.g. `const double a[]`.
    pub fn prototype(&self) -> String {
        match self.kind {
            ParamKind::Value => format!("{} {}", self.qualified_type(), self.name),
            ParamKind::Input { .. } | ParamKind::InOut { .. } => format!("{} {}[]", self.qualified_type(), self.name),
        }
    }

    /// Abstract declarator form used in function-pointer types, e.g. `const double*`.
    pub fn abstract_type(&self) -> String {
        match self.kind {
            ParamKind::Value => self.qualified_type(),
            ParamKind::Input { .. } | ParamKind::InOut { .. } => format!("{}*", self.qualified_type()),
        }
    }
}

/// Return type and parameter list of a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub ret: CType,
    pub params: Vec<Param>,
}

impl Signature {
    /// Opening lines of a definition, one parameter per line, ending with `{`.
    pub fn definition(&self, name: &str) -> String {
        let params = self.params.iter().map(|p| format!("\t{}", p.definition())).join(",\n");
        format!("{} {name}(\n{params})\n{{", self.ret.c_name())
    }

    /// Single-line prototype terminated by `;`.
    pub fn prototype(&self, name: &str) -> String {
        let params = self.params.iter().map(Param::prototype).join(", ");
        format!("{} {name}({params});", self.ret.c_name())
    }

    /// Function-pointer typedef named `alias`.
    pub fn pointer_typedef(&self, alias: &str) -> String {
        let params = self.params.iter().map(Param::abstract_type).join(", ");
        format!("typedef {} (*{alias})({params});", self.ret.c_name())
    }
}
