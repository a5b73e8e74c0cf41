//! Privilege level tracking and navigation.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::{DriverError, Result};
use crate::platform::PrivilegeLevel;

/// One hop between adjacent privilege levels.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Command that performs the hop.
    pub command: String,

    /// Password prompt the device may raise after `command`.
    pub auth_prompt: Option<Regex>,
}

impl Transition {
    /// Whether the hop can ask for a password.
    pub fn may_prompt_for_secret(&self) -> bool {
        self.auth_prompt.is_some()
    }
}

/// Tracks which CLI mode the session is in and plans moves between modes.
///
/// Levels are nodes and each `previous_priv` link is an undirected edge, so
/// a route from any mode to any other is a breadth-first search away.
#[derive(Debug)]
pub struct PrivilegeManager {
    levels: IndexMap<String, PrivilegeLevel>,
    neighbors: HashMap<String, Vec<String>>,
    current: Option<String>,
}

impl PrivilegeManager {
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        let mut neighbors: HashMap<String, Vec<String>> = HashMap::new();
        for (name, level) in &levels {
            neighbors.entry(name.clone()).or_default();
            if let Some(parent) = &level.previous_priv {
                neighbors.entry(name.clone()).or_default().push(parent.clone());
                neighbors.entry(parent.clone()).or_default().push(name.clone());
            }
        }

        Self {
            levels,
            neighbors,
            current: None,
        }
    }

    /// Level whose prompt pattern accepts `prompt`, checked in definition order.
    pub fn level_for_prompt(&self, prompt: &str) -> Result<&PrivilegeLevel> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .ok_or_else(|| {
                DriverError::UnknownPrivilege {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    /// Re-derive the current level from a freshly read prompt.
    pub fn observe_prompt(&mut self, prompt: &str) -> Result<()> {
        let name = self.level_for_prompt(prompt)?.name.clone();
        self.current = Some(name);
        Ok(())
    }

    /// Whether `level` is `ancestor` or sits below it in the level tree.
    pub fn is_within(&self, level: &str, ancestor: &str) -> bool {
        let mut cursor = Some(level);
        while let Some(name) = cursor {
            if name == ancestor {
                return true;
            }
            cursor = self
                .levels
                .get(name)
                .and_then(|l| l.previous_priv.as_deref());
        }
        false
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn forget_current(&mut self) {
        self.current = None;
    }

    pub fn get(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.levels.get(name)
    }

    /// Shortest route from `from` to `to`, both ends included.
    pub fn route(&self, from: &str, to: &str) -> Result<Vec<String>> {
        if !self.levels.contains_key(to) {
            return Err(DriverError::UnknownPrivilege {
                prompt: to.to_string(),
            }
            .into());
        }
        if from == to {
            return Ok(vec![to.to_string()]);
        }

        let mut came_from: HashMap<&str, &str> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        came_from.insert(from, from);

        while let Some(node) = queue.pop_front() {
            if node == to {
                let mut path = vec![to.to_string()];
                let mut cursor = to;
                while cursor != from {
                    cursor = came_from[cursor];
                    path.push(cursor.to_string());
                }
                path.reverse();
                return Ok(path);
            }
            for next in self.neighbors.get(node).into_iter().flatten() {
                let next = next.as_str();
                if !came_from.contains_key(next) {
                    came_from.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        Err(DriverError::NoPrivilegePath {
            from: from.to_string(),
            to: to.to_string(),
        }
        .into())
    }

    /// The command moving from `from` to the adjacent level `to`.
    pub fn transition(&self, from: &str, to: &str) -> Option<Transition> {
        let source = self.levels.get(from)?;
        let target = self.levels.get(to)?;

        if target.previous_priv.as_deref() == Some(from) {
            return Some(Transition {
                command: target.escalate_command.clone()?,
                auth_prompt: target.escalate_prompt.clone(),
            });
        }
        if source.previous_priv.as_deref() == Some(to) {
            return Some(Transition {
                command: source.deescalate_command.clone()?,
                auth_prompt: None,
            });
        }
        None
    }
}
