pub mod codec;
pub mod command;
pub mod generator;

pub use codec::ProgramError;
pub use command::Command;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One node of a program tree. Each node owns its children, and the number of children always
/// equals the arity of its command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    command: Command,
    children: Vec<Node>,
}

impl Node {
    /// Builds a node from a command and its subtrees.
    ///
    /// # Panics
    /// When the number of children differs from the command's arity. Generators and variation
    /// operators never produce such a node, so this is an invariant violation.
    pub fn new(command: Command, children: Vec<Node>) -> Self {
        assert_eq!(
            children.len(),
            command.arity(),
            "arity violation: {} takes {} children, got {}",
            command,
            command.arity(),
            children.len()
        );
        Self { command, children }
    }

    pub fn leaf(command: Command) -> Self {
        Self::new(command, Vec::new())
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Node::size).sum::<usize>()
    }

    /// Levels in this subtree, a lone node has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Node::depth).max().unwrap_or(0)
    }

    /// Swaps the command for one of the same arity.
    fn set_command(&mut self, command: Command) {
        assert_eq!(
            command.arity(),
            self.command.arity(),
            "arity violation: cannot replace {} with {}",
            self.command,
            command
        );
        self.command = command;
    }

    fn write_preorder(&self, out: &mut String) {
        out.push(self.command.to_char());
        for child in &self.children {
            child.write_preorder(out);
        }
    }
}

/// A complete behaviour program. Nodes are addressed by their preorder index, the root being 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Program {
    root: Node,
}

impl Program {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn size(&self) -> usize {
        self.root.size()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Subtree rooted at preorder index `index`.
    pub fn subtree(&self, index: usize) -> Option<&Node> {
        let mut node = &self.root;
        let mut index = index;
        loop {
            if index == 0 {
                return Some(node);
            }
            let (child, rest) = Self::descend(node, index)?;
            node = &node.children[child];
            index = rest;
        }
    }

    /// Depth level of the node at `index`, the root being on level 1.
    pub fn level_of(&self, index: usize) -> Option<usize> {
        let mut node = &self.root;
        let mut index = index;
        let mut level = 1;
        loop {
            if index == 0 {
                return Some(level);
            }
            let (child, rest) = Self::descend(node, index)?;
            node = &node.children[child];
            index = rest;
            level += 1;
        }
    }

    /// Replaces the subtree at `index` and hands back the one it displaced.
    pub fn replace_subtree(&mut self, index: usize, replacement: Node) -> Option<Node> {
        let slot = self.subtree_mut(index)?;
        Some(std::mem::replace(slot, replacement))
    }

    /// Gives the node at `index` a new command of the same arity.
    pub fn set_command(&mut self, index: usize, command: Command) -> bool {
        match self.subtree_mut(index) {
            Some(node) => {
                node.set_command(command);
                true
            }
            None => false,
        }
    }

    /// Preorder walk over every node.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut out = Vec::with_capacity(self.size());
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Preorder character encoding, see `codec`.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.size());
        self.root.write_preorder(&mut out);
        out
    }

    fn subtree_mut(&mut self, index: usize) -> Option<&mut Node> {
        let mut node = &mut self.root;
        let mut index = index;
        loop {
            if index == 0 {
                return Some(node);
            }
            let (child, rest) = Self::descend(node, index)?;
            node = &mut node.children[child];
            index = rest;
        }
    }

    /// Finds which child of `node` holds preorder index `index` (relative to `node`) and the
    /// index relative to that child.
    fn descend(node: &Node, index: usize) -> Option<(usize, usize)> {
        let mut rest = index - 1;
        for (i, child) in node.children.iter().enumerate() {
            let size = child.size();
            if rest < size {
                return Some((i, rest));
            }
            rest -= size;
        }
        None
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<Program> for String {
    fn from(program: Program) -> Self {
        program.encode()
    }
}

impl TryFrom<String> for Program {
    type Error = ProgramError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Every node carries exactly as many children as its command requires.
    pub(crate) fn arity_holds(program: &Program) -> bool {
        program
            .nodes()
            .iter()
            .all(|n| n.children().len() == n.command().arity())
    }

    fn sample() -> Program {
        // IFWALL(LEFT, PROGN2(WALKFRONT, ALIGN))
        Program::new(Node::new(
            Command::IfWall,
            vec![
                Node::leaf(Command::Left),
                Node::new(
                    Command::Progn2,
                    vec![Node::leaf(Command::WalkFront), Node::leaf(Command::Align)],
                ),
            ],
        ))
    }

    #[test]
    fn test_size_and_depth() {
        let program = sample();
        assert_eq!(program.size(), 5);
        assert_eq!(program.depth(), 3);
        assert!(arity_holds(&program));
    }

    #[test]
    fn test_preorder_addressing() {
        let program = sample();
        let commands: Vec<Command> = (0..program.size())
            .map(|i| program.subtree(i).unwrap().command())
            .collect();
        assert_eq!(
            commands,
            vec![
                Command::IfWall,
                Command::Left,
                Command::Progn2,
                Command::WalkFront,
                Command::Align
            ]
        );
        assert!(program.subtree(5).is_none());
        assert_eq!(program.level_of(0), Some(1));
        assert_eq!(program.level_of(2), Some(2));
        assert_eq!(program.level_of(4), Some(3));
        assert_eq!(program.level_of(9), None);
    }

    #[test]
    fn test_nodes_are_preorder() {
        let program = sample();
        let encoded: String = program.nodes().iter().map(|n| n.command().to_char()).collect();
        assert_eq!(encoded, "IL2FA");
        assert_eq!(program.encode(), "IL2FA");
    }

    #[test]
    fn test_replace_subtree() {
        let mut program = sample();
        let old = program
            .replace_subtree(2, Node::leaf(Command::WalkBack))
            .unwrap();
        assert_eq!(old.command(), Command::Progn2);
        assert_eq!(program.encode(), "ILB");
        assert!(arity_holds(&program));
        assert!(program.replace_subtree(10, Node::leaf(Command::Left)).is_none());
    }

    #[test]
    fn test_set_command_same_arity() {
        let mut program = sample();
        assert!(program.set_command(0, Command::IfBall));
        assert!(program.set_command(1, Command::Right));
        assert_eq!(program.encode(), "CR2FA");
    }

    #[test]
    #[should_panic(expected = "arity violation")]
    fn test_set_command_other_arity_panics() {
        let mut program = sample();
        program.set_command(0, Command::Progn3);
    }

    #[test]
    #[should_panic(expected = "arity violation")]
    fn test_node_with_wrong_child_count_panics() {
        Node::new(Command::Progn3, vec![Node::leaf(Command::Left)]);
    }
}
