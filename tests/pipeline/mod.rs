mod end_to_end;
mod failures;
mod gateway;
