mod missing;
mod queued;
mod running;
