//! Chain of responsibility shared by the modification and query pipelines.
//!
//! Commands run forward until one handles the request; then every command
//! that ran gets a `post_process` call in reverse order, so a command early in
//! the chain can prepare state that it consumes again on the way out.

use pomkit_project::ProjectModel;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command dealt with the request; stop the forward pass.
    Handled,
    /// Continue with the next command.
    NotApplicable,
}

/// State a chain runs against.
pub trait ChainContext {
    fn is_mutation(&self) -> bool;
    fn mark_modified_by_command(&mut self);
}

impl ChainContext for ProjectModel {
    fn is_mutation(&self) -> bool {
        ProjectModel::is_mutation(self)
    }

    fn mark_modified_by_command(&mut self) {
        ProjectModel::mark_modified_by_command(self);
    }
}

pub trait Command<C> {
    fn name(&self) -> &'static str;

    /// Support commands (guards, formatting) never count as having modified
    /// the request.
    fn is_support(&self) -> bool {
        false
    }

    fn execute(&mut self, ctx: &mut C) -> Result<Outcome>;

    /// Returning `true` stops the reverse pass.
    fn post_process(&mut self, _ctx: &mut C) -> Result<bool> {
        Ok(false)
    }
}

pub struct Chain<C> {
    commands: Vec<Box<dyn Command<C>>>,
}

impl<C: ChainContext> Chain<C> {
    pub fn new(commands: Vec<Box<dyn Command<C>>>) -> Self {
        Self { commands }
    }

    /// Runs the chain; returns whether any command handled the request.
    /// An error from either pass aborts the run.
    pub fn run(&mut self, ctx: &mut C) -> Result<bool> {
        let mut executed = 0;
        let mut handled = false;

        for command in self.commands.iter_mut() {
            executed += 1;
            if command.execute(ctx)? == Outcome::Handled {
                tracing::debug!(target: "pomkit.chain", command = command.name(), "handled");
                if !command.is_support() && ctx.is_mutation() {
                    ctx.mark_modified_by_command();
                }
                handled = true;
                break;
            }
        }

        for command in self.commands[..executed].iter_mut().rev() {
            if command.post_process(ctx)? {
                tracing::debug!(target: "pomkit.chain", command = command.name(), "stopped post-processing");
                break;
            }
        }

        Ok(handled)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Context {
        mutation: bool,
        modified: bool,
    }

    impl ChainContext for Context {
        fn is_mutation(&self) -> bool {
            self.mutation
        }

        fn mark_modified_by_command(&mut self) {
            self.modified = true;
        }
    }

    struct Step {
        name: &'static str,
        outcome: Outcome,
        support: bool,
        stop_post: bool,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Command<Context> for Step {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_support(&self) -> bool {
            self.support
        }

        fn execute(&mut self, _ctx: &mut Context) -> Result<Outcome> {
            self.log.borrow_mut().push(format!("execute {}", self.name));
            Ok(self.outcome)
        }

        fn post_process(&mut self, _ctx: &mut Context) -> Result<bool> {
            self.log.borrow_mut().push(format!("post {}", self.name));
            Ok(self.stop_post)
        }
    }

    fn step(
        name: &'static str,
        outcome: Outcome,
        log: &Rc<RefCell<Vec<String>>>,
    ) -> Step {
        Step {
            name,
            outcome,
            support: false,
            stop_post: false,
            log: log.clone(),
        }
    }

    #[test]
    fn stops_at_first_handler_and_unwinds_in_reverse() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut chain: Chain<Context> = Chain::new(vec![
            Box::new(step("a", Outcome::NotApplicable, &log)),
            Box::new(step("b", Outcome::Handled, &log)),
            Box::new(step("c", Outcome::Handled, &log)),
        ]);
        let mut ctx = Context {
            mutation: true,
            ..Context::default()
        };

        assert!(chain.run(&mut ctx).unwrap());
        assert!(ctx.modified);
        assert_eq!(
            *log.borrow(),
            ["execute a", "execute b", "post b", "post a"]
        );
    }

    #[test]
    fn post_process_can_stop_the_reverse_pass() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut second = step("b", Outcome::NotApplicable, &log);
        second.stop_post = true;
        let mut chain: Chain<Context> = Chain::new(vec![
            Box::new(step("a", Outcome::NotApplicable, &log)),
            Box::new(second),
        ]);

        assert!(!chain.run(&mut Context::default()).unwrap());
        assert_eq!(*log.borrow(), ["execute a", "execute b", "post b"]);
    }

    #[test]
    fn support_commands_and_queries_do_not_mark_modification() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut guard = step("guard", Outcome::Handled, &log);
        guard.support = true;
        let mut ctx = Context {
            mutation: true,
            ..Context::default()
        };
        assert!(Chain::new(vec![Box::new(guard) as Box<dyn Command<Context>>])
            .run(&mut ctx)
            .unwrap());
        assert!(!ctx.modified);

        let mut query = Context::default();
        assert!(Chain::new(vec![
            Box::new(step("q", Outcome::Handled, &log)) as Box<dyn Command<Context>>
        ])
        .run(&mut query)
        .unwrap());
        assert!(!query.modified);
    }
}
