//! Static and dynamic composite agents: run several child agents as one.

use super::Agent;
use crate::error::AgentError;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
struct InvalidState(&'static str);

impl std::fmt::Display for InvalidState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for InvalidState {}

#[derive(Debug)]
struct AggregatedCloseError {
    primary: AgentError,
    suppressed_count: usize,
}

impl std::fmt::Display for AggregatedCloseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} further close error(s) suppressed)",
            self.primary, self.suppressed_count
        )
    }
}

impl std::error::Error for AggregatedCloseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.primary)
    }
}

fn aggregate_close_errors(mut errors: Vec<AgentError>) -> Option<AgentError> {
    if errors.is_empty() {
        return None;
    }
    let primary = errors.remove(0);
    if errors.is_empty() {
        return Some(primary);
    }
    Some(AgentError::Other(Box::new(AggregatedCloseError {
        primary,
        suppressed_count: errors.len(),
    })))
}

/// A fixed, immutable set of child agents run as one: `do_work` sums their
/// work counts (short-circuiting on the first error, the ordinary duty-cycle
/// behavior); `on_start`/`on_close` instead run every child in order and
/// aggregate errors, so one failing child never strands its siblings unopened
/// or unclosed.
pub struct CompositeAgent {
    children: Vec<Box<dyn Agent>>,
    role_name: String,
}

impl CompositeAgent {
    /// Wraps `children`, deriving a bracketed role name from theirs
    /// (`"[a,b,c]"`).
    #[must_use]
    pub fn new(children: Vec<Box<dyn Agent>>) -> Self {
        let role_name = format!(
            "[{}]",
            children.iter().map(|c| c.role_name()).collect::<Vec<_>>().join(",")
        );
        Self { children, role_name }
    }
}

impl Agent for CompositeAgent {
    fn on_start(&mut self) -> Result<(), AgentError> {
        let mut errors = Vec::new();
        for child in &mut self.children {
            if let Err(e) = child.on_start() {
                errors.push(e);
            }
        }
        aggregate_close_errors(errors).map_or(Ok(()), Err)
    }

    fn do_work(&mut self) -> Result<usize, AgentError> {
        let mut total = 0usize;
        for child in &mut self.children {
            total += child.do_work()?;
        }
        Ok(total)
    }

    fn on_close(&mut self) -> Result<(), AgentError> {
        let mut errors = Vec::new();
        for child in &mut self.children {
            if let Err(e) = child.on_close() {
                errors.push(e);
            }
        }
        aggregate_close_errors(errors).map_or(Ok(()), Err)
    }

    fn role_name(&self) -> &str {
        &self.role_name
    }
}

const INIT: u8 = 0;
const ACTIVE: u8 = 1;
const CLOSED: u8 = 2;

/// A composite agent whose child set can change at runtime: any thread
/// holding a shared reference may call [`DynamicCompositeAgent::try_add`] or
/// [`DynamicCompositeAgent::try_remove`], each occupying a single pending
/// slot the hosting `do_work` thread drains on its next cycle. Only one add
/// and one remove may be outstanding at a time; a second attempt while one is
/// pending is rejected rather than queued.
pub struct DynamicCompositeAgent {
    role_name: String,
    children: Mutex<Vec<Box<dyn Agent>>>,
    state: AtomicU8,
    pending_add: Mutex<Option<Box<dyn Agent>>>,
    add_completed: AtomicBool,
    pending_remove: Mutex<Option<String>>,
    remove_completed: AtomicBool,
}

impl DynamicCompositeAgent {
    /// Creates an empty dynamic composite in the `Init` state.
    #[must_use]
    pub fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            children: Mutex::new(Vec::new()),
            state: AtomicU8::new(INIT),
            pending_add: Mutex::new(None),
            add_completed: AtomicBool::new(true),
            pending_remove: Mutex::new(None),
            remove_completed: AtomicBool::new(true),
        }
    }

    /// Queues `agent` to be added on the hosting thread's next `do_work`
    /// call.
    ///
    /// # Errors
    /// Returns an error if this composite is not `Active`, or if an add is
    /// already pending.
    pub fn try_add(&self, agent: Box<dyn Agent>) -> Result<(), AgentError> {
        if self.state.load(Ordering::Acquire) != ACTIVE {
            return Err(AgentError::Other(Box::new(InvalidState(
                "try_add called while not active",
            ))));
        }
        let mut slot = self.pending_add.lock().expect("pending_add mutex poisoned");
        if slot.is_some() {
            return Err(AgentError::Other(Box::new(InvalidState("an add is already pending"))));
        }
        self.add_completed.store(false, Ordering::Release);
        *slot = Some(agent);
        Ok(())
    }

    /// Whether the most recently queued add has been applied.
    #[must_use]
    pub fn has_add_agent_completed(&self) -> bool {
        self.add_completed.load(Ordering::Acquire)
    }

    /// Queues the child whose `role_name()` equals `role_name` to be removed
    /// on the hosting thread's next `do_work` call.
    ///
    /// # Errors
    /// Returns an error if this composite is not `Active`, or if a remove is
    /// already pending.
    pub fn try_remove(&self, role_name: &str) -> Result<(), AgentError> {
        if self.state.load(Ordering::Acquire) != ACTIVE {
            return Err(AgentError::Other(Box::new(InvalidState(
                "try_remove called while not active",
            ))));
        }
        let mut slot = self.pending_remove.lock().expect("pending_remove mutex poisoned");
        if slot.is_some() {
            return Err(AgentError::Other(Box::new(InvalidState(
                "a remove is already pending",
            ))));
        }
        self.remove_completed.store(false, Ordering::Release);
        *slot = Some(role_name.to_string());
        Ok(())
    }

    /// Whether the most recently queued remove has been applied.
    #[must_use]
    pub fn has_remove_agent_completed(&self) -> bool {
        self.remove_completed.load(Ordering::Acquire)
    }

    /// Current number of children (a snapshot; may change concurrently).
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.lock().expect("children mutex poisoned").len()
    }

    fn apply_pending_add(&mut self) -> Result<(), AgentError> {
        let pending = self.pending_add.lock().expect("pending_add mutex poisoned").take();
        if let Some(mut agent) = pending {
            agent.on_start()?;
            self.children.lock().expect("children mutex poisoned").push(agent);
            self.add_completed.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn apply_pending_remove(&mut self) -> Result<(), AgentError> {
        let pending = self.pending_remove.lock().expect("pending_remove mutex poisoned").take();
        if let Some(name) = pending {
            let removed = {
                let mut children = self.children.lock().expect("children mutex poisoned");
                children.iter().position(|c| c.role_name() == name).map(|pos| children.remove(pos))
            };
            if let Some(mut agent) = removed {
                agent.on_close()?;
            }
            self.remove_completed.store(true, Ordering::Release);
        }
        Ok(())
    }
}

impl Agent for DynamicCompositeAgent {
    fn on_start(&mut self) -> Result<(), AgentError> {
        self.state.store(ACTIVE, Ordering::Release);
        Ok(())
    }

    fn do_work(&mut self) -> Result<usize, AgentError> {
        self.apply_pending_add()?;
        self.apply_pending_remove()?;

        let mut total = 0usize;
        let mut children = self.children.lock().expect("children mutex poisoned");
        for child in children.iter_mut() {
            total += child.do_work()?;
        }
        Ok(total)
    }

    fn on_close(&mut self) -> Result<(), AgentError> {
        self.state.store(CLOSED, Ordering::Release);
        let mut errors = Vec::new();
        let mut children = self.children.lock().expect("children mutex poisoned");
        for child in children.iter_mut() {
            if let Err(e) = child.on_close() {
                errors.push(e);
            }
        }
        children.clear();
        aggregate_close_errors(errors).map_or(Ok(()), Err)
    }

    fn role_name(&self) -> &str {
        &self.role_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant {
        name: &'static str,
        work: usize,
    }
    impl Agent for Constant {
        fn do_work(&mut self) -> Result<usize, AgentError> {
            Ok(self.work)
        }
        fn role_name(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn composite_sums_child_work_and_brackets_role_name() {
        let mut composite = CompositeAgent::new(vec![
            Box::new(Constant { name: "a", work: 2 }),
            Box::new(Constant { name: "b", work: 3 }),
        ]);
        assert_eq!(composite.role_name(), "[a,b]");
        assert_eq!(composite.do_work().unwrap(), 5);
    }

    struct FailOnClose;
    impl Agent for FailOnClose {
        fn do_work(&mut self) -> Result<usize, AgentError> {
            Ok(0)
        }
        fn on_close(&mut self) -> Result<(), AgentError> {
            Err(AgentError::Other(Box::new(InvalidState("close failed"))))
        }
        fn role_name(&self) -> &str {
            "fails-on-close"
        }
    }

    #[test]
    fn composite_closes_every_child_even_if_one_errors() {
        let mut composite = CompositeAgent::new(vec![
            Box::new(FailOnClose),
            Box::new(Constant { name: "b", work: 0 }),
            Box::new(FailOnClose),
        ]);
        let result = composite.on_close();
        assert!(result.is_err());
    }

    #[test]
    fn dynamic_composite_add_then_remove() {
        let mut dynamic = DynamicCompositeAgent::new("dynamic");
        dynamic.on_start().unwrap();

        dynamic.try_add(Box::new(Constant { name: "a", work: 7 })).unwrap();
        assert!(!dynamic.has_add_agent_completed());
        assert_eq!(dynamic.do_work().unwrap(), 7);
        assert!(dynamic.has_add_agent_completed());
        assert_eq!(dynamic.child_count(), 1);

        dynamic.try_remove("a").unwrap();
        assert!(!dynamic.has_remove_agent_completed());
        assert_eq!(dynamic.do_work().unwrap(), 0);
        assert!(dynamic.has_remove_agent_completed());
        assert_eq!(dynamic.child_count(), 0);
    }

    #[test]
    fn dynamic_composite_rejects_second_pending_add() {
        let mut dynamic = DynamicCompositeAgent::new("dynamic");
        dynamic.on_start().unwrap();
        dynamic.try_add(Box::new(Constant { name: "a", work: 0 })).unwrap();
        assert!(dynamic.try_add(Box::new(Constant { name: "b", work: 0 })).is_err());
    }

    #[test]
    fn dynamic_composite_rejects_operations_before_start() {
        let dynamic = DynamicCompositeAgent::new("dynamic");
        assert!(dynamic.try_add(Box::new(Constant { name: "a", work: 0 })).is_err());
    }
}
