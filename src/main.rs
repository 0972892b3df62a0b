use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use schism_ffi::binding::{Declarations, NativeLibrary, StructType};
use schism_ffi::call::Value;
use schism_ffi::layout::ManagedKind;
use schism_ffi::memory::NativeAddress;
use schism_ffi::{FfiConfig, Platform};

#[derive(Parser)]
#[command(name = "schism-ffi")]
#[command(about = "Inspect C layouts and call native functions through declaration files")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "SCHISM_FFI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pointer and long widths of the host
    Platform,

    /// Print the layout of the structs in a declaration file
    Layout {
        /// Path to the declaration file
        declarations: PathBuf,

        /// Only print this struct
        #[arg(long = "struct")]
        struct_name: Option<String>,

        /// Pointer width in bytes of the target platform
        #[arg(long, requires = "long_width")]
        pointer_width: Option<usize>,

        /// Long width in bytes of the target platform
        #[arg(long, requires = "pointer_width")]
        long_width: Option<usize>,
    },

    /// Bind a declared function and call it
    Call {
        /// Library path or name (empty for the current process)
        library: String,

        /// Path to the declaration file
        declarations: PathBuf,

        /// Function to call
        symbol: String,

        /// Arguments, parsed by the declared parameter types
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => FfiConfig::from_file(path)?,
        None => FfiConfig::default(),
    };

    match cli.command {
        Commands::Platform => {
            let platform = Platform::host();
            println!("{}", platform);
            println!("pointer: {} bytes", platform.pointer_width().bytes());
            println!("long:    {} bytes", platform.long_width().bytes());
            Ok(())
        }
        Commands::Layout {
            declarations,
            struct_name,
            pointer_width,
            long_width,
        } => {
            let platform = match (pointer_width, long_width) {
                (Some(pointer), Some(long)) => Platform::from_bytes(pointer, long)
                    .with_context(|| format!("unsupported widths: pointer {pointer}, long {long}"))?,
                _ => config.platform()?,
            };
            let decls = Declarations::parse_file(&declarations, &platform)
                .with_context(|| format!("in {}", declarations.display()))?;

            println!("# {}", platform);
            let mut printed = 0;
            for layout in decls.structs() {
                if struct_name.as_deref().is_some_and(|name| name != layout.name()) {
                    continue;
                }
                print!("{}", StructType::from_layout(layout.clone()));
                printed += 1;
            }
            if printed == 0 {
                match struct_name {
                    Some(name) => bail!("no struct named '{}' in {}", name, declarations.display()),
                    None => println!("(no structs declared)"),
                }
            }
            Ok(())
        }
        Commands::Call {
            library,
            declarations,
            symbol,
            args,
        } => {
            let platform = Platform::host();
            let decls = Declarations::parse_file(&declarations, &platform)
                .with_context(|| format!("in {}", declarations.display()))?;
            let function = decls
                .function(&symbol)
                .with_context(|| format!("'{}' is not declared in {}", symbol, declarations.display()))?;
            let descriptor = function
                .descriptor(&platform)?
                .with_narrowing(config.marshal.narrowing);

            if args.len() != descriptor.arity() {
                bail!(
                    "{} takes {} argument(s), got {}",
                    symbol,
                    descriptor.arity(),
                    args.len()
                );
            }
            let values = descriptor
                .params()
                .iter()
                .zip(&args)
                .map(|(abi, arg)| {
                    parse_value(arg, abi.managed_kind())
                        .with_context(|| format!("argument '{}' as {}", arg, abi.native()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            let stack = config.memory_stack().context("creating the scratch stack")?;
            let library = NativeLibrary::open(&library)?;
            // SAFETY: the user vouches that the declaration matches the symbol.
            let downcall = unsafe { library.bind(&symbol, descriptor)? };
            match stack.with_frame(|frame| downcall.invoke_in(frame, &values))? {
                Some(value) => println!("{}", value),
                None => println!("(void)"),
            }
            Ok(())
        }
    }
}

fn parse_value(text: &str, kind: ManagedKind) -> anyhow::Result<Value> {
    let value = match kind {
        ManagedKind::I8 => Value::I8(text.parse()?),
        ManagedKind::U8 => Value::U8(text.parse()?),
        ManagedKind::I16 => Value::I16(text.parse()?),
        ManagedKind::U16 => Value::U16(text.parse()?),
        ManagedKind::I32 => Value::I32(text.parse()?),
        ManagedKind::U32 => Value::U32(text.parse()?),
        ManagedKind::I64 => Value::I64(text.parse()?),
        ManagedKind::U64 => Value::U64(text.parse()?),
        ManagedKind::F32 => Value::F32(text.parse()?),
        ManagedKind::F64 => Value::F64(text.parse()?),
        ManagedKind::Address => {
            let bits = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(hex) => usize::from_str_radix(hex, 16)?,
                None => text.parse()?,
            };
            Value::Address(NativeAddress::from_bits(bits))
        }
        ManagedKind::Struct => bail!("structs cannot be passed on the command line"),
    };
    Ok(value)
}
