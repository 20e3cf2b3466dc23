mod applications;
mod common;
mod jobs;
