//! Parser for declaration files.
//!
//! # File Format
//!
//! ```text
//! # Comments start with #
//!
//! # Structs: fields in declaration order, separated by ',' or ';'
//! struct point { x: int, y: int }
//! struct span {
//!     start: struct point,
//!     end: struct point
//! }
//!
//! # Functions: name: (arg_types) -> return_type
//! labs: (long) -> long
//! strlen: (const char *) -> size_t
//! manhattan: (struct point, struct point) -> unsigned long
//! exit: (int) -> void
//! ```
//!
//! Type names may use C spellings (`int`, `unsigned long`, `size_t`,
//! `ptrdiff_t`, `double`, anything ending in `*`) or Rust spellings (`i32`,
//! `u8`, `usize`, `f64`, `pointer`). `struct NAME` embeds a previously
//! declared struct by value. `void` is only valid as a return type or as the
//! sole entry of an empty parameter list.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::{BindError, StructType};
use crate::call::CallDescriptor;
use crate::layout::{LayoutError, NativeType, StructLayout, StructSchema};
use crate::platform::Platform;

/// A declared native function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    symbol: String,
    params: Vec<NativeType>,
    ret: Option<NativeType>,
}

impl FunctionDecl {
    pub fn new(symbol: impl Into<String>, params: Vec<NativeType>, ret: Option<NativeType>) -> Self {
        Self {
            symbol: symbol.into(),
            params,
            ret,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn params(&self) -> &[NativeType] {
        &self.params
    }

    /// `None` for `void`.
    pub fn ret(&self) -> Option<&NativeType> {
        self.ret.as_ref()
    }

    pub fn descriptor(&self, platform: &Platform) -> Result<CallDescriptor, LayoutError> {
        CallDescriptor::for_platform(&self.params, self.ret.clone(), platform)
    }
}

/// Structs and functions declared for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarations {
    platform: Platform,
    structs: Vec<Arc<StructLayout>>,
    functions: Vec<FunctionDecl>,
}

impl Declarations {
    /// Parse a declaration file from a path.
    pub fn parse_file(path: impl AsRef<Path>, platform: &Platform) -> Result<Self, BindError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| BindError::Parse {
            line: 0,
            message: format!("Failed to read {}: {}", path.as_ref().display(), e),
        })?;
        Self::parse(&content, platform)
    }

    /// Parse declarations from a string.
    pub fn parse(content: &str, platform: &Platform) -> Result<Self, BindError> {
        let mut parser = Parser {
            declarations: Declarations {
                platform: *platform,
                structs: Vec::new(),
                functions: Vec::new(),
            },
            names: HashSet::new(),
        };
        let mut pending: Option<(usize, String)> = None;

        for (index, raw) in content.lines().enumerate() {
            let line_num = index + 1;
            let line = raw.split_once('#').map_or(raw, |(code, _)| code).trim();
            if line.is_empty() {
                continue;
            }

            if let Some((start, mut text)) = pending.take() {
                text.push(' ');
                text.push_str(line);
                if line.contains('}') {
                    parser.parse_struct(&text, start)?;
                } else {
                    pending = Some((start, text));
                }
                continue;
            }

            if is_struct_definition(line) {
                if line.contains('}') {
                    parser.parse_struct(line, line_num)?;
                } else {
                    pending = Some((line_num, line.to_string()));
                }
            } else {
                parser.parse_function(line, line_num)?;
            }
        }

        if let Some((start, _)) = pending {
            return Err(BindError::Parse {
                line: start,
                message: "Unterminated struct declaration: missing '}'".to_string(),
            });
        }
        Ok(parser.declarations)
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Struct layouts in declaration order.
    pub fn structs(&self) -> &[Arc<StructLayout>] {
        &self.structs
    }

    /// Functions in declaration order.
    pub fn functions(&self) -> &[FunctionDecl] {
        &self.functions
    }

    pub fn function(&self, symbol: &str) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.symbol == symbol)
    }

    pub fn struct_layout(&self, name: &str) -> Option<&Arc<StructLayout>> {
        self.structs.iter().find(|s| s.name() == name)
    }

    pub fn struct_type(&self, name: &str) -> Option<StructType> {
        self.struct_layout(name)
            .map(|layout| StructType::from_layout(Arc::clone(layout)))
    }
}

fn is_struct_definition(line: &str) -> bool {
    line.strip_prefix("struct")
        .is_some_and(|rest| rest.starts_with(char::is_whitespace) && rest.contains('{'))
}

struct Parser {
    declarations: Declarations,
    names: HashSet<String>,
}

impl Parser {
    /// Reserve `key` in the declaration namespace.
    fn claim_name(&mut self, key: String, line: usize) -> Result<(), BindError> {
        if self.names.contains(&key) {
            return Err(BindError::Parse {
                line,
                message: format!("Duplicate declaration: '{}'", key),
            });
        }
        self.names.insert(key);
        Ok(())
    }

    /// Parse `struct name { field: type, ... }`.
    fn parse_struct(&mut self, text: &str, line: usize) -> Result<(), BindError> {
        let parse_error = |message: String| BindError::Parse { line, message };
        let rest = text.strip_prefix("struct").unwrap_or(text);
        let (name, rest) = rest
            .split_once('{')
            .ok_or_else(|| parse_error("Expected '{' after struct name".to_string()))?;
        let (body, trailer) = rest
            .split_once('}')
            .ok_or_else(|| parse_error("Expected '}' to close struct".to_string()))?;
        if !matches!(trailer.trim(), "" | ";") {
            return Err(parse_error(format!(
                "Unexpected text after struct: '{}'",
                trailer.trim()
            )));
        }
        let name = name.trim();
        if !is_identifier(name) {
            return Err(parse_error(format!("Invalid struct name: '{}'", name)));
        }
        self.claim_name(format!("struct {name}"), line)?;

        let mut schema = StructSchema::new(name);
        for field in body.split([',', ';']).map(str::trim).filter(|f| !f.is_empty()) {
            let (field_name, type_name) = field
                .split_once(':')
                .ok_or_else(|| parse_error(format!("Expected 'name: type' in '{}'", field)))?;
            let field_name = field_name.trim();
            if !is_identifier(field_name) {
                return Err(parse_error(format!("Invalid field name: '{}'", field_name)));
            }
            let ty = self
                .resolve_type(type_name.trim(), line)?
                .ok_or_else(|| {
                    BindError::Layout(LayoutError::VoidNotAllowed(format!(
                        "the type of field {}.{}",
                        name, field_name
                    )))
                })?;
            schema = schema.field(field_name, ty);
        }

        let layout = schema.layout(&self.declarations.platform)?;
        self.declarations.structs.push(Arc::new(layout));
        Ok(())
    }

    /// Parse `name: (arg_types) -> return_type`.
    fn parse_function(&mut self, text: &str, line: usize) -> Result<(), BindError> {
        let parse_error = |message: String| BindError::Parse { line, message };
        let (name, signature) = text
            .split_once(':')
            .ok_or_else(|| parse_error("Expected ':' after function name".to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(parse_error("Function name cannot be empty".to_string()));
        }
        if !is_identifier(name) {
            return Err(parse_error(format!("Invalid function name: '{}'", name)));
        }
        self.claim_name(name.to_string(), line)?;

        let signature = signature
            .trim()
            .strip_prefix('(')
            .ok_or_else(|| parse_error("Expected '(' at start of type signature".to_string()))?;
        let (args, rest) = signature
            .split_once(')')
            .ok_or_else(|| parse_error("Unmatched '(' in type signature".to_string()))?;
        let ret = rest
            .trim()
            .strip_prefix("->")
            .ok_or_else(|| parse_error("Expected '->' after argument list".to_string()))?
            .trim();

        let mut params = Vec::new();
        let args: Vec<&str> = args.split(',').map(str::trim).collect();
        let no_params = matches!(args.as_slice(), [""] | ["void"]);
        if !no_params {
            for (index, arg) in args.iter().enumerate() {
                if arg.is_empty() {
                    return Err(parse_error(format!("Empty argument type at position {}", index)));
                }
                let ty = self.resolve_type(arg, line)?.ok_or_else(|| {
                    BindError::Layout(LayoutError::VoidNotAllowed(format!(
                        "parameter {} of {}",
                        index, name
                    )))
                })?;
                params.push(ty);
            }
        }
        let ret = self.resolve_type(ret, line)?;

        self.declarations
            .functions
            .push(FunctionDecl::new(name, params, ret));
        Ok(())
    }

    /// Resolve a type name; `Ok(None)` means `void`.
    fn resolve_type(&self, name: &str, line: usize) -> Result<Option<NativeType>, BindError> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized == "void" {
            return Ok(None);
        }
        if !normalized.ends_with('*') {
            if let Some(struct_name) = normalized.strip_prefix("struct ") {
                return self
                    .declarations
                    .struct_layout(struct_name.trim())
                    .map(|layout| Some(NativeType::Struct(Arc::clone(layout))))
                    .ok_or_else(|| BindError::Parse {
                        line,
                        message: format!("Unknown struct: '{}'", struct_name.trim()),
                    });
            }
        }
        NativeType::from_name(&normalized)
            .map(Some)
            .map_err(|err| BindError::Parse {
                line,
                message: err.to_string(),
            })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
# sample declarations
struct point { x: int, y: int }
struct span {
    start: struct point;   # by value
    end: struct point;
}

labs: (long) -> long
strlen: (const char *) -> size_t
width: (struct span) -> i32
abort: (void) -> void
";

    #[test]
    fn test_parse_sample() {
        let decls = Declarations::parse(SAMPLE, &Platform::LP64).unwrap();
        assert_eq!(decls.structs().len(), 2);
        let span = decls.struct_layout("span").unwrap();
        assert_eq!(span.size(), 16);
        assert_eq!(span.offsets(), vec![0, 8]);

        let labs = decls.function("labs").unwrap();
        assert_eq!(labs.params(), &[NativeType::CLong]);
        assert_eq!(labs.ret(), Some(&NativeType::CLong));

        let strlen = decls.function("strlen").unwrap();
        assert_eq!(strlen.params(), &[NativeType::Pointer]);
        assert_eq!(strlen.ret(), Some(&NativeType::SizeT));

        let abort = decls.function("abort").unwrap();
        assert!(abort.params().is_empty());
        assert_eq!(abort.ret(), None);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = Declarations::parse("ok: () -> int\nbad: (quux) -> int\n", &Platform::LP64)
            .unwrap_err();
        assert!(matches!(err, BindError::Parse { line: 2, .. }));

        let err = Declarations::parse("f: (int -> int", &Platform::LP64).unwrap_err();
        assert!(matches!(err, BindError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_void_parameter_rejected() {
        let err = Declarations::parse("f: (int, void) -> int", &Platform::LP64).unwrap_err();
        assert!(matches!(
            err,
            BindError::Layout(LayoutError::VoidNotAllowed(_))
        ));
    }

    #[test]
    fn test_unknown_struct() {
        let err = Declarations::parse("f: (struct nope) -> int", &Platform::LP64).unwrap_err();
        assert_eq!(
            err,
            BindError::Parse {
                line: 1,
                message: "Unknown struct: 'nope'".to_string()
            }
        );
    }

    #[test]
    fn test_duplicates() {
        let err = Declarations::parse("f: () -> int\nf: () -> int", &Platform::LP64).unwrap_err();
        assert!(matches!(err, BindError::Parse { line: 2, .. }));

        let err = Declarations::parse("struct s { a: int, a: int }", &Platform::LP64).unwrap_err();
        assert!(matches!(
            err,
            BindError::Layout(LayoutError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_unterminated_struct() {
        let err = Declarations::parse("struct s {\n a: int,\n", &Platform::LP64).unwrap_err();
        assert!(matches!(err, BindError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_platform_dependent_layout() {
        let text = "struct rec { tag: u8, len: unsigned long }";
        let lp64 = Declarations::parse(text, &Platform::LP64).unwrap();
        let llp64 = Declarations::parse(text, &Platform::LLP64).unwrap();
        assert_eq!(lp64.struct_layout("rec").unwrap().size(), 16);
        assert_eq!(llp64.struct_layout("rec").unwrap().size(), 8);
    }
}
