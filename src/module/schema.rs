use super::Root;
use crate::{
    fbs::{Follow, Identifier, Table, TableBuilder, TableVector, Verifier, VerifyError},
    hal::format::ExecutableFormat,
};

/// Schema of module files: a [`ModuleDef`] at the root.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Module;

impl Module {
    pub const IDENTIFIER: Identifier = Identifier::new(b"SPMD");
}

impl Root for Module {
    type View<'a> = ModuleDef<'a>;

    fn verify(verifier: &mut Verifier<'_>, position: usize) -> Result<(), VerifyError> {
        ModuleDef::verify(verifier, position)
    }
}

/// A named collection of functions and executables.
#[derive(Debug, Clone, Copy)]
pub struct ModuleDef<'a>(Table<'a>);

impl<'a> Follow<'a> for ModuleDef<'a> {
    #[inline]
    fn follow(table: Table<'a>) -> Self {
        Self(table)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ModuleDefArgs<'b> {
    pub name: Option<&'b str>,
    pub version: u32,
    pub functions: Vec<TableBuilder>,
    pub executables: Vec<TableBuilder>,
}

impl<'a> ModuleDef<'a> {
    pub const NAME: u16 = 0;
    pub const VERSION: u16 = 1;
    pub const FUNCTIONS: u16 = 2;
    pub const EXECUTABLES: u16 = 3;

    pub fn verify(verifier: &mut Verifier<'_>, position: usize) -> Result<(), VerifyError> {
        verifier
            .table(position)?
            .string(Self::NAME, "name", false)?
            .scalar::<u32>(Self::VERSION, "version", false)?
            .tables(Self::FUNCTIONS, "functions", false, FunctionDef::verify)?
            .tables(Self::EXECUTABLES, "executables", false, ExecutableDef::verify)?
            .finish()
    }

    pub fn build(args: ModuleDefArgs<'_>) -> TableBuilder {
        let mut table = TableBuilder::new().scalar(Self::VERSION, args.version);
        if let Some(name) = args.name {
            table = table.string(Self::NAME, name);
        }
        table
            .tables(Self::FUNCTIONS, args.functions)
            .tables(Self::EXECUTABLES, args.executables)
    }

    #[inline]
    pub fn name(&self) -> Option<&'a str> {
        self.0.get_str(Self::NAME)
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.0.get(Self::VERSION, 0)
    }

    #[inline]
    pub fn functions(&self) -> Option<TableVector<'a, FunctionDef<'a>>> {
        self.0.get_tables(Self::FUNCTIONS)
    }

    #[inline]
    pub fn executables(&self) -> Option<TableVector<'a, ExecutableDef<'a>>> {
        self.0.get_tables(Self::EXECUTABLES)
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionDef<'a>> {
        self.functions()?
            .iter()
            .find(|function| function.name() == name)
    }
}

/// An exported function: its signature and bytecode.
#[derive(Debug, Clone, Copy)]
pub struct FunctionDef<'a>(Table<'a>);

impl<'a> Follow<'a> for FunctionDef<'a> {
    #[inline]
    fn follow(table: Table<'a>) -> Self {
        Self(table)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FunctionDefArgs<'b> {
    pub name: &'b str,
    pub input_count: u16,
    pub result_count: u16,
    pub bytecode: &'b [u8],
}

impl<'a> FunctionDef<'a> {
    pub const NAME: u16 = 0;
    pub const INPUT_COUNT: u16 = 1;
    pub const RESULT_COUNT: u16 = 2;
    pub const BYTECODE: u16 = 3;

    pub fn verify(verifier: &mut Verifier<'_>, position: usize) -> Result<(), VerifyError> {
        verifier
            .table(position)?
            .string(Self::NAME, "name", true)?
            .scalar::<u16>(Self::INPUT_COUNT, "input_count", false)?
            .scalar::<u16>(Self::RESULT_COUNT, "result_count", false)?
            .vector::<u8>(Self::BYTECODE, "bytecode", false)?
            .finish()
    }

    pub fn build(args: FunctionDefArgs<'_>) -> TableBuilder {
        TableBuilder::new()
            .string(Self::NAME, args.name)
            .scalar(Self::INPUT_COUNT, args.input_count)
            .scalar(Self::RESULT_COUNT, args.result_count)
            .vector(Self::BYTECODE, args.bytecode)
    }

    /// The function name. Verified buffers always carry one.
    #[inline]
    pub fn name(&self) -> &'a str {
        self.0.get_str(Self::NAME).unwrap_or_default()
    }

    #[inline]
    pub fn input_count(&self) -> u16 {
        self.0.get(Self::INPUT_COUNT, 0)
    }

    #[inline]
    pub fn result_count(&self) -> u16 {
        self.0.get(Self::RESULT_COUNT, 0)
    }

    #[inline]
    pub fn bytecode(&self) -> &'a [u8] {
        self.0
            .get_vector::<u8>(Self::BYTECODE)
            .map(|bytecode| bytecode.bytes())
            .unwrap_or_default()
    }
}

/// Opaque executable contents tagged with their format.
#[derive(Debug, Clone, Copy)]
pub struct ExecutableDef<'a>(Table<'a>);

impl<'a> Follow<'a> for ExecutableDef<'a> {
    #[inline]
    fn follow(table: Table<'a>) -> Self {
        Self(table)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutableDefArgs<'b> {
    pub format: ExecutableFormat,
    pub contents: &'b [u8],
}

impl<'a> ExecutableDef<'a> {
    pub const FORMAT: u16 = 0;
    pub const CONTENTS: u16 = 1;

    pub fn verify(verifier: &mut Verifier<'_>, position: usize) -> Result<(), VerifyError> {
        verifier
            .table(position)?
            .scalar::<u32>(Self::FORMAT, "format", false)?
            .vector::<u8>(Self::CONTENTS, "contents", false)?
            .finish()
    }

    pub fn build(args: ExecutableDefArgs<'_>) -> TableBuilder {
        TableBuilder::new()
            .scalar(Self::FORMAT, u32::from(args.format))
            .vector(Self::CONTENTS, args.contents)
    }

    #[inline]
    pub fn format(&self) -> ExecutableFormat {
        ExecutableFormat::from(self.0.get(Self::FORMAT, 0u32))
    }

    #[inline]
    pub fn contents(&self) -> &'a [u8] {
        self.0
            .get_vector::<u8>(Self::CONTENTS)
            .map(|contents| contents.bytes())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{
        ExecutableDef, ExecutableDefArgs, FunctionDef, FunctionDefArgs, Module, ModuleDef,
        ModuleDefArgs,
    };
    use crate::{
        fbs::{Builder, TableBuilder},
        hal::format::ExecutableFormat,
        module::{LoadError, ModuleFile},
    };

    fn sample() -> Vec<u8> {
        let functions = [("main", 2, 1), ("helper", 1, 1)]
            .into_iter()
            .map(|(name, input_count, result_count)| {
                FunctionDef::build(FunctionDefArgs {
                    name,
                    input_count,
                    result_count,
                    bytecode: &[0x01, 0x02, 0x03],
                })
            })
            .collect();
        let executables = vec![ExecutableDef::build(ExecutableDefArgs {
            format: ExecutableFormat::SPIRV,
            contents: b"\x03\x02\x23\x07",
        })];
        let root = ModuleDef::build(ModuleDefArgs {
            name: Some("sample"),
            version: 3,
            functions,
            executables,
        });
        Builder::finish::<Module>(root, Some(Module::IDENTIFIER)).into_bytes()
    }

    #[test]
    fn test_module() -> Result<(), Box<dyn Error>> {
        let file = ModuleFile::<Module>::from_vec(Some(Module::IDENTIFIER), sample())?;
        let module = file.root();
        assert_eq!(module.name(), Some("sample"));
        assert_eq!(module.version(), 3);

        let functions = module.functions().ok_or("missing functions")?;
        let names: Vec<_> = functions.iter().map(|function| function.name()).collect();
        assert_eq!(names, ["main", "helper"]);

        let main = module.find_function("main").ok_or("missing main")?;
        assert_eq!(main.input_count(), 2);
        assert_eq!(main.result_count(), 1);
        assert_eq!(main.bytecode(), &[0x01, 0x02, 0x03]);
        assert!(module.find_function("absent").is_none());

        let executable = module
            .executables()
            .and_then(|executables| executables.get(0))
            .ok_or("missing executable")?;
        assert_eq!(executable.format(), ExecutableFormat::SPIRV);
        assert_eq!(executable.contents(), b"\x03\x02\x23\x07");
        Ok(())
    }

    #[test]
    fn test_function_requires_name() {
        let function = TableBuilder::new().scalar(FunctionDef::INPUT_COUNT, 1u16);
        let root = ModuleDef::build(ModuleDefArgs {
            functions: vec![function],
            ..Default::default()
        });
        let bytes = Builder::finish::<Module>(root, Some(Module::IDENTIFIER)).into_bytes();
        assert!(matches!(
            ModuleFile::<Module>::from_vec(Some(Module::IDENTIFIER), bytes),
            Err(LoadError::Verify(_))
        ));
    }

    #[test]
    fn test_corrupted() {
        fastrand::seed(42);
        let bytes = sample();
        for _ in 0..1000 {
            let mut bytes = bytes.clone();
            let index = fastrand::usize(..bytes.len());
            bytes[index] ^= 1u8 << fastrand::u32(..8);
            let id = Some(Module::IDENTIFIER);
            let Ok(file) = ModuleFile::<Module>::wrap_buffer(id, &bytes) else {
                continue;
            };
            let module = file.root();
            let _ = (module.name(), module.version());
            for function in module.functions().into_iter().flat_map(|functions| functions.iter()) {
                let _ = (function.name(), function.bytecode().len(), function.input_count());
            }
            let executables = module.executables().into_iter().flat_map(|list| list.iter());
            for executable in executables {
                let _ = (executable.format(), executable.contents().len());
            }
        }
    }
}
