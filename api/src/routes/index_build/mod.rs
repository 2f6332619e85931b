pub mod build_request;
pub mod build_response;
pub mod build_route;
