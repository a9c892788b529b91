use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module as LLVMModule;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::{BasicValueEnum, FunctionValue};

use crate::ir::{Constant, IRType, Value};

use std::collections::HashMap;

pub mod function;
pub mod instruction;

/// Lowers the in-crate IR to real LLVM IR through inkwell. The input has
/// already been verified, so malformed IR here is a bug and panics.
pub struct LLVMCodegen<'ctx> {
    context: &'ctx Context,
    module: LLVMModule<'ctx>,
    builder: Builder<'ctx>,
    function_value_map: HashMap<String, FunctionValue<'ctx>>,
    value_map: HashMap<String, BasicValueEnum<'ctx>>,
    current_function: Option<FunctionValue<'ctx>>,
}

impl<'ctx> LLVMCodegen<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();

        Self {
            context,
            module,
            builder,
            function_value_map: HashMap::new(),
            value_map: HashMap::new(),
            current_function: None,
        }
    }

    pub fn get_llvm_type(&self, ir_type: &IRType) -> BasicTypeEnum<'ctx> {
        match ir_type {
            IRType::I1 => self.context.bool_type().as_basic_type_enum(),
            IRType::I8 => self.context.i8_type().as_basic_type_enum(),
            IRType::I32 => self.context.i32_type().as_basic_type_enum(),
            IRType::F64 => self.context.f64_type().as_basic_type_enum(),
            IRType::Ptr => self
                .context
                .ptr_type(inkwell::AddressSpace::default())
                .as_basic_type_enum(),
            IRType::Void => {
                panic!("void has no value representation")
            }
        }
    }

    pub fn declare_function(&mut self, function: &crate::ir::Function) -> FunctionValue<'ctx> {
        if let Some(f) = self.module.get_function(&function.name) {
            self.function_value_map.insert(function.name.clone(), f);
            return f;
        }

        let param_types: Vec<BasicMetadataTypeEnum> = function
            .params
            .iter()
            .map(|(_, ty)| self.get_llvm_type(ty).into())
            .collect();

        let fn_type = if matches!(function.return_type, IRType::Void) {
            self.context
                .void_type()
                .fn_type(&param_types, function.is_variadic)
        } else {
            let ret_type = self.get_llvm_type(&function.return_type);
            ret_type.fn_type(&param_types, function.is_variadic)
        };

        let fn_val = self.module.add_function(&function.name, fn_type, None);
        self.function_value_map
            .insert(function.name.clone(), fn_val);
        fn_val
    }

    fn store_value(&mut self, name: String, value: BasicValueEnum<'ctx>) {
        self.value_map.insert(name, value);
    }

    /// Resolves an IR value. Constants are untyped in the IR; the
    /// instruction that uses them supplies the type.
    pub fn codegen_value(&mut self, val: &Value, ty: &IRType) -> BasicValueEnum<'ctx> {
        match val {
            Value::Constant(c) => self.codegen_constant(c, ty),
            Value::Register(name) | Value::Argument(name) => self
                .value_map
                .get(name)
                .cloned()
                .unwrap_or_else(|| panic!("value {} not found", name)),
            Value::Global(name) => {
                if let Some(global) = self.module.get_global(name) {
                    global.as_pointer_value().into()
                } else {
                    panic!("global {} not found", name)
                }
            }
        }
    }

    fn codegen_constant(&self, constant: &Constant, ty: &IRType) -> BasicValueEnum<'ctx> {
        match constant {
            Constant::Bool(b) => self.context.bool_type().const_int(*b as u64, false).into(),
            Constant::Int(v) => match ty {
                IRType::I1 => self.context.bool_type().const_int(*v as u64, false).into(),
                IRType::I8 => self.context.i8_type().const_int(*v as u64, true).into(),
                IRType::F64 => self.context.f64_type().const_float(*v as f64).into(),
                _ => self.context.i32_type().const_int(*v as u64, true).into(),
            },
            Constant::Float(f) => self.context.f64_type().const_float(*f).into(),
            Constant::Null => self
                .context
                .ptr_type(inkwell::AddressSpace::default())
                .const_null()
                .into(),
        }
    }

    pub fn generate_module(&mut self, ir_module: &crate::ir::Module) -> Result<(), String> {
        // interned string literals, null terminated
        let mut strings: Vec<_> = ir_module.global_strings.iter().collect();
        strings.sort();
        for (name, content) in strings {
            let string_val = self.context.const_string(content.as_bytes(), true);
            let global = self.module.add_global(string_val.get_type(), None, name);
            global.set_initializer(&string_val);
            global.set_linkage(inkwell::module::Linkage::Private);
            global.set_unnamed_addr(true);
            global.set_constant(true);
        }

        for global in &ir_module.globals {
            let ty = self.get_llvm_type(&global.ty);
            let llvm_global = self.module.add_global(ty, None, &global.name);
            let init = self.codegen_constant(&global.init, &global.ty);
            llvm_global.set_initializer(&init);
            llvm_global.set_linkage(inkwell::module::Linkage::Internal);
            llvm_global.set_constant(global.is_constant);
        }

        // declare everything first so calls resolve in any order
        for function in &ir_module.functions {
            self.declare_function(function);
        }

        for function in &ir_module.functions {
            if !function.is_external {
                self.codegen_function(function)?;
            }
        }

        self.module
            .verify()
            .map_err(|e| format!("module verification failed: {}", e.to_string()))
    }

    pub fn emit_to_file(&self, filename: &str) -> Result<(), String> {
        self.module
            .print_to_file(filename)
            .map_err(|e| format!("failed to emit LLVM IR: {:?}", e))
    }

    pub fn print_to_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn get_module(&self) -> &LLVMModule<'ctx> {
        &self.module
    }
}
