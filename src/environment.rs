use crate::types::{NativeProcedure, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("name '{0}' is not defined")]
    UnboundVariable(String),
    #[error("expected {expected} arguments, got {found}")]
    ArityMismatch { expected: usize, found: usize },
}

/// One scope frame. Frames are shared through `Rc<RefCell<..>>` so that
/// closures and child frames can keep their parent alive; the `outer` link
/// is fixed at construction, which keeps chains acyclic.
#[derive(Debug)]
pub struct Environment {
    outer: Option<Rc<RefCell<Environment>>>,
    bindings: HashMap<String, Value>,
}

/// Text rendering of one frame, bindings sorted by name.
pub type ScopeSnapshot = Vec<(String, String)>;

impl Environment {
    /// Creates a new, empty top-level environment.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: None,
            bindings: HashMap::new(),
        }))
    }

    /// Creates the root environment seeded with the given native procedures.
    pub fn new_global<I, K>(natives: I) -> Rc<RefCell<Environment>>
    where
        I: IntoIterator<Item = (K, NativeProcedure)>,
        K: Into<String>,
    {
        let env_ptr = Environment::new();
        {
            let mut env = env_ptr.borrow_mut();
            for (name, native) in natives {
                env.define(name.into(), Value::Native(native));
            }
        }
        env_ptr
    }

    /// Root environment with the standard procedure table.
    pub fn new_global_populated() -> Rc<RefCell<Environment>> {
        Environment::new_global(crate::primitives::standard_procedures())
    }

    /// Creates a new, empty environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer_env),
            bindings: HashMap::new(),
        }))
    }

    /// Creates a frame binding each parameter to the argument at the same
    /// position. The lists must have equal length.
    pub fn with_bindings(
        params: &[String],
        args: Vec<Value>,
        outer: Option<Rc<RefCell<Environment>>>,
    ) -> Result<Rc<RefCell<Self>>, EnvError> {
        if params.len() != args.len() {
            return Err(EnvError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
            });
        }
        Ok(Rc::new(RefCell::new(Environment {
            outer,
            bindings: params.iter().cloned().zip(args).collect(),
        })))
    }

    /// Defines a variable in *this* frame, replacing any existing binding here.
    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Frame-local lookup; never consults outer frames.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn outer(&self) -> Option<Rc<RefCell<Environment>>> {
        self.outer.clone()
    }

    /// Returns the innermost frame, starting at `env`, that binds `name`.
    pub fn find(
        env: &Rc<RefCell<Environment>>,
        name: &str,
    ) -> Result<Rc<RefCell<Environment>>, EnvError> {
        let mut current = env.clone();
        loop {
            let outer = {
                let frame = current.borrow();
                if frame.bindings.contains_key(name) {
                    break;
                }
                frame.outer.clone()
            };
            match outer {
                Some(next) => current = next,
                None => return Err(EnvError::UnboundVariable(name.to_string())),
            }
        }
        Ok(current)
    }

    /// Looks up a variable's value through the chain.
    pub fn lookup(env: &Rc<RefCell<Environment>>, name: &str) -> Result<Value, EnvError> {
        let owner = Environment::find(env, name)?;
        let frame = owner.borrow();
        frame
            .get(name)
            .cloned()
            .ok_or_else(|| EnvError::UnboundVariable(name.to_string()))
    }

    /// Overwrites an *existing* binding in the frame that owns it.
    pub fn set(env: &Rc<RefCell<Environment>>, name: &str, value: Value) -> Result<(), EnvError> {
        let owner = Environment::find(env, name)?;
        owner.borrow_mut().define(name.to_string(), value);
        Ok(())
    }

    /// Renders every frame from this one outwards to the root.
    pub fn snapshot(env: &Rc<RefCell<Environment>>) -> Vec<ScopeSnapshot> {
        let mut scopes = Vec::new();
        let mut current = Some(env.clone());
        while let Some(frame_ptr) = current {
            let frame = frame_ptr.borrow();
            let mut scope: ScopeSnapshot = frame
                .bindings
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect();
            scope.sort();
            scopes.push(scope);
            current = frame.outer.clone();
        }
        scopes
    }

    fn add_identifiers(&self, mut identifiers: HashSet<String>) -> HashSet<String> {
        identifiers.extend(self.bindings.keys().cloned());
        match self.outer {
            Some(ref outer_env_ptr) => outer_env_ptr.borrow().add_identifiers(identifiers),
            None => identifiers,
        }
    }

    /// Gets every identifier visible from this environment
    pub fn get_identifiers(&self) -> HashSet<String> {
        self.add_identifiers(HashSet::new())
    }
}
