// Cooperative plugin runtime
// Single core, no preemption. Handlers never block: a handler that has
// to wait registers the wait, persists where to continue and returns.
// The dispatcher polls suspended sessions until they finish.
//
// machine:    resumable step machines (labels, persisted state, resume)
// wait:       timed and bus-transfer waits per session, clock sources
// plugin:     plugin lifecycle and handler contract
// dispatcher: session arena, command admission, polling
// queue:      fixed-size FIFO
// status:     handler outcomes and errors

pub mod dispatcher;
pub mod machine;
pub mod plugin;
mod queue;
pub mod status;
pub mod wait;

pub use dispatcher::{Completion, DispatchError, Dispatcher, SessionId, TickSummary};
pub use machine::{Label, PluginState, Program, ResumePoint, Step, StepContext};
pub use plugin::{Invocation, Plugin};
pub use status::{HandlerResult, PluginError, Status};
pub use wait::{
    Clock, EmbassyClock, ManualClock, TimeoutWaiter, Transfer, WaitContext, WaitFor, WaitTable,
};
