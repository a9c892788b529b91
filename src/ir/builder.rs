use super::*;

/// Saved cursor position, restored after nested emission (entry-block
/// alloca placement, initializer generation).
#[derive(Debug, Clone, Copy)]
pub struct InsertPoint {
    function: Option<usize>,
    block: Option<usize>,
}

pub struct IRBuilder {
    module: Module,
    current_function: Option<usize>,
    current_block: Option<usize>,
    register_counter: usize,
    label_counter: usize,
    string_counter: usize,
}

impl IRBuilder {
    pub fn new(module_name: &str) -> Self {
        IRBuilder {
            module: Module {
                name: module_name.to_string(),
                functions: Vec::new(),
                globals: Vec::new(),
                global_strings: HashMap::new(),
            },
            current_function: None,
            current_block: None,
            register_counter: 0,
            label_counter: 0,
            string_counter: 0,
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn finish(self) -> Module {
        self.module
    }

    pub fn new_register(&mut self) -> String {
        let reg = format!("%{}", self.register_counter);
        self.register_counter += 1;
        reg
    }

    pub fn new_label(&mut self, prefix: &str) -> String {
        let label = format!("{}{}", prefix, self.label_counter);
        self.label_counter += 1;
        label
    }

    pub fn add_global(&mut self, global: GlobalVar) {
        self.module.globals.push(global);
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.module.globals.iter().any(|g| g.name == name)
    }

    /// Interns a string literal and returns the name of its global.
    pub fn add_global_string(&mut self, content: &str) -> String {
        if let Some((name, _)) = self
            .module
            .global_strings
            .iter()
            .find(|(_, existing)| existing.as_str() == content)
        {
            return name.clone();
        }
        let name = format!(".str{}", self.string_counter);
        self.string_counter += 1;
        self.module
            .global_strings
            .insert(name.clone(), content.to_string());
        name
    }

    pub fn declare_external(&mut self, function: Function) {
        self.module.functions.push(function);
    }

    /// Opens a new function with an `entry` block and positions the cursor
    /// there. Registers restart per function.
    pub fn start_function(
        &mut self,
        name: &str,
        params: Vec<(String, IRType)>,
        return_type: IRType,
    ) -> usize {
        self.module.functions.push(Function {
            name: name.to_string(),
            params,
            return_type,
            blocks: vec![BasicBlock {
                label: "entry".to_string(),
                instructions: Vec::new(),
                terminator: None,
            }],
            is_external: false,
            is_variadic: false,
        });
        let idx = self.module.functions.len() - 1;
        self.current_function = Some(idx);
        self.current_block = Some(0);
        self.register_counter = 0;
        idx
    }

    pub fn create_block(&mut self, label: String) -> usize {
        let function = self.current_function_mut();
        function.blocks.push(BasicBlock {
            label,
            instructions: Vec::new(),
            terminator: None,
        });
        function.blocks.len() - 1
    }

    pub fn set_current_block(&mut self, idx: usize) {
        self.current_block = Some(idx);
    }

    pub fn current_block_index(&self) -> usize {
        self.current_block.expect("no active block")
    }

    pub fn current_block_label(&self) -> String {
        let function = self.current_function_ref();
        function.blocks[self.current_block.expect("no active block")]
            .label
            .clone()
    }

    pub fn insert_point(&self) -> InsertPoint {
        InsertPoint {
            function: self.current_function,
            block: self.current_block,
        }
    }

    pub fn restore_insert_point(&mut self, point: InsertPoint) {
        self.current_function = point.function;
        self.current_block = point.block;
    }

    pub fn add_instruction(&mut self, instr: Instruction) {
        let block = self.current_block.expect("no active block");
        let function = self.current_function_mut();
        function.blocks[block].instructions.push(instr);
    }

    /// Sets the block terminator unless one is already present; a block
    /// ends with exactly one control transfer.
    pub fn set_terminator(&mut self, term: Terminator) {
        let block = self.current_block.expect("no active block");
        let function = self.current_function_mut();
        let slot = &mut function.blocks[block].terminator;
        if slot.is_none() {
            *slot = Some(term);
        }
    }

    pub fn is_terminated(&self) -> bool {
        let function = self.current_function_ref();
        function.blocks[self.current_block.expect("no active block")]
            .terminator
            .is_some()
    }

    /// Places an alloca in the entry block of the current function, after
    /// any allocas already hoisted there, without disturbing the cursor.
    pub fn entry_alloca(&mut self, ty: IRType, span: Range<usize>) -> String {
        let dest = self.new_register();
        let function = self.current_function_mut();
        let entry = &mut function.blocks[0];
        let pos = entry
            .instructions
            .iter()
            .take_while(|i| matches!(i, Instruction::Alloca { .. }))
            .count();
        entry.instructions.insert(
            pos,
            Instruction::Alloca {
                dest: dest.clone(),
                ty,
                span,
            },
        );
        dest
    }

    /// Adds an incoming edge to a phi created earlier (loop headers learn
    /// their back-edge value only after the body is generated).
    pub fn add_phi_incoming(&mut self, block: usize, phi_dest: &str, value: Value, label: String) {
        let function = self.current_function_mut();
        for instr in &mut function.blocks[block].instructions {
            if let Instruction::Phi { dest, incoming, .. } = instr {
                if dest == phi_dest {
                    incoming.push((value, label));
                    return;
                }
            }
        }
        panic!("phi {} not found in block {}", phi_dest, block);
    }

    pub fn current_function_name(&self) -> String {
        self.current_function_ref().name.clone()
    }

    pub fn current_function_ref(&self) -> &Function {
        &self.module.functions[self.current_function.expect("no active function")]
    }

    fn current_function_mut(&mut self) -> &mut Function {
        let idx = self.current_function.expect("no active function");
        &mut self.module.functions[idx]
    }
}
