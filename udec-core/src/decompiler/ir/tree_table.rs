//! Instruction trees, the address-keyed tree table, and control-flow
//! reconstruction.
//!
//! Reconstruction partitions a flat decoded instruction stream into maximal
//! straight-line units ending in a control transfer, rewriting low-level
//! jumps into high-level statements as it goes. The table owns whole trees:
//! inserting under an existing address replaces the previous tree atomically,
//! and references between trees are plain addresses resolved through the
//! table, so replacement never invalidates an outstanding reference.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use crate::decompiler::error::{DecompilerError, Result};

use super::instr::Instr;
use super::tree::TreeNode;

/// One decoded unit element: an instruction plus the address it was decoded
/// at. Only the first instruction of a unit carries an address; companions
/// synthesized alongside it (flag updates) are unaddressed.
#[derive(Debug, Clone)]
pub struct AddressedInstruction {
    pub address: Option<u64>,
    pub instr: Rc<Instr>,
}

impl AddressedInstruction {
    pub fn at(address: u64, instr: Rc<Instr>) -> Self {
        AddressedInstruction {
            address: Some(address),
            instr,
        }
    }

    pub fn unaddressed(instr: Rc<Instr>) -> Self {
        AddressedInstruction {
            address: None,
            instr,
        }
    }
}

/// A block-shaped instruction tree tagged with its origin address.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionTree {
    address: u64,
    root: Rc<Instr>,
}

impl InstructionTree {
    pub fn new(address: u64, instructions: Vec<Rc<Instr>>) -> Self {
        InstructionTree {
            address,
            root: Rc::new(Instr::Block(instructions)),
        }
    }

    /// Wrap an existing block root.
    pub fn from_root(address: u64, root: Rc<Instr>) -> Self {
        debug_assert!(matches!(&*root, Instr::Block(_)));
        InstructionTree { address, root }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn root(&self) -> &Rc<Instr> {
        &self.root
    }

    /// The tree's top-level instruction list.
    pub fn instructions(&self) -> &[Rc<Instr>] {
        match &*self.root {
            Instr::Block(children) => children,
            _ => &[],
        }
    }
}

/// Address-keyed table of instruction trees with a designated entry tree.
///
/// Keyed by a `BTreeMap` so that "table order" is ascending address order
/// everywhere, which keeps renumbering and emission deterministic.
#[derive(Debug, Clone, Default)]
pub struct InstructionTreeTable {
    trees: BTreeMap<u64, InstructionTree>,
    entry_address: Option<u64>,
}

impl InstructionTreeTable {
    /// Insert a tree, replacing any previous tree at the same address.
    pub fn insert(&mut self, tree: InstructionTree) {
        self.trees.insert(tree.address(), tree);
    }

    pub fn remove(&mut self, address: u64) {
        self.trees.remove(&address);
    }

    pub fn get(&self, address: u64) -> Option<&InstructionTree> {
        self.trees.get(&address)
    }

    pub fn entry_address(&self) -> Option<u64> {
        self.entry_address
    }

    pub fn entry_tree(&self) -> Option<&InstructionTree> {
        self.entry_address.and_then(|addr| self.trees.get(&addr))
    }

    /// Snapshot of the table's keys in ascending order.
    pub fn addresses(&self) -> Vec<u64> {
        self.trees.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionTree> {
        self.trees.values()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Flatten nested blocks in every tree.
    pub fn clean(&mut self) {
        for address in self.addresses() {
            if let Some(tree) = self.trees.get(&address) {
                let cleaned = tree.root().clean();
                if !Rc::ptr_eq(tree.root(), &cleaned) {
                    self.insert(InstructionTree::from_root(address, cleaned));
                }
            }
        }
    }

    /// Check that every referenced address is a key in the table.
    pub fn validate(&self) -> Result<()> {
        for tree in self.trees.values() {
            let root = Rc::clone(tree.root());
            for instr in std::iter::once(Rc::clone(&root)).chain(root.descendants()) {
                let target = match &*instr {
                    Instr::Goto { target } | Instr::TreeRef { target } => *target,
                    _ => continue,
                };
                if !self.trees.contains_key(&target) {
                    return Err(DecompilerError::DanglingTreeReference { address: target });
                }
            }
        }
        Ok(())
    }

    /// Reconstruct control flow from a flat decoded instruction stream.
    ///
    /// Splits the stream at every jump destination, sealing the running
    /// buffer with a synthesized fallthrough `Goto` when execution runs into
    /// a destination from above. `Jump` becomes `Goto` and ends its tree;
    /// `ConditionalJump` becomes a single-arm else-less `If` holding a
    /// `TreeRef` and falls through; `Return` ends its tree. A truncated
    /// stream still seals its trailing buffer. The entry tree is bound last,
    /// after every insertion under its address has settled.
    pub fn from_instruction_stream(stream: &[AddressedInstruction]) -> Result<Self> {
        let mut table = InstructionTreeTable::default();
        if stream.is_empty() {
            return Ok(table);
        }

        let entry_address = match stream[0].address {
            Some(address) => address,
            None => return Err(DecompilerError::MissingAddress),
        };

        // Addresses that are jumped to, plus the entry point
        let mut jump_destinations: HashSet<u64> = stream
            .iter()
            .filter_map(|pair| match &*pair.instr {
                Instr::Jump { target } | Instr::ConditionalJump { target, .. } => Some(*target),
                _ => None,
            })
            .collect();
        jump_destinations.insert(entry_address);

        let mut current: Vec<Rc<Instr>> = Vec::new();
        let mut current_address = 0u64;

        for pair in stream {
            if current.is_empty() {
                current_address = match pair.address {
                    Some(address) => address,
                    None => return Err(DecompilerError::MissingAddress),
                };
            }

            let boundary = match pair.address {
                Some(address) if jump_destinations.contains(&address) => Some(address),
                _ => None,
            };

            let mut instr = Rc::clone(&pair.instr);
            let mut end_tree = false;
            match &*pair.instr {
                Instr::Jump { target } => {
                    instr = Instr::goto(*target);
                    end_tree = true;
                }
                Instr::ConditionalJump { condition, target } => {
                    instr = Instr::single_if(
                        Rc::clone(condition),
                        Rc::new(Instr::TreeRef { target: *target }),
                    );
                }
                Instr::Return => end_tree = true,
                _ => {}
            }

            if let Some(address) = boundary {
                if !current.is_empty() {
                    // Execution from above falls into this destination
                    current.push(Instr::goto(address));
                    table.insert(InstructionTree::new(
                        current_address,
                        std::mem::take(&mut current),
                    ));
                    current_address = address;
                }
            }

            current.push(instr);

            if end_tree {
                table.insert(InstructionTree::new(
                    current_address,
                    std::mem::take(&mut current),
                ));
            }
        }

        // A truncated stream still yields its partial trailing tree
        if !current.is_empty() {
            table.insert(InstructionTree::new(current_address, current));
        }

        table.entry_address = Some(entry_address);
        table.validate()?;
        Ok(table)
    }
}
