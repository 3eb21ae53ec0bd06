mod queue;
mod search;
mod workflow;
