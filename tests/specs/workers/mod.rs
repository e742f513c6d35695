mod completion;
mod disconnect;
mod heartbeat;
