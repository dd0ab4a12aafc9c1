use crate::{Command, Node};
use hyper::{Body, Method, Request, Response, StatusCode};
use log::warn;
use std::sync::Arc;

/// JSON-over-HTTP front end for a `Node`. Grounded on
/// `examples/http-paxos/service.rs`'s `Handler`: a `match (method, path)`
/// dispatcher that decodes the body, awaits the role agent, and encodes the
/// reply. Unlike that KV-store handler, every route here speaks the same
/// `Command` envelope in both directions.
#[derive(Clone)]
pub struct Handler {
    node: Arc<Node>,
    self_token: Arc<str>,
}

impl Handler {
    pub fn new(node: Arc<Node>, self_token: Arc<str>) -> Handler {
        Handler { node, self_token }
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
        match (req.method(), req.uri().path()) {
            (&Method::GET, "/server_id") => Ok(text_response(StatusCode::OK, &self.self_token)),
            (&Method::POST, "/proposer/client-request") => self.client_request(req).await,
            (&Method::POST, "/acceptor/prepare") => self.decode_and_dispatch(req).await,
            (&Method::POST, "/proposer/promise") => self.decode_and_dispatch(req).await,
            (&Method::POST, "/acceptor/accept") => self.decode_and_dispatch(req).await,
            (&Method::POST, "/proposer/accepted") => self.decode_and_dispatch(req).await,
            _ => Ok(empty_response(StatusCode::NOT_FOUND)),
        }
    }

    async fn client_request(&self, req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
        let command = match decode(req).await? {
            Ok(c) => c,
            Err(resp) => return Ok(resp),
        };

        let value = match command {
            Command::ClientRequest { value } => value,
            other => {
                warn!("expected ClientRequest, got {:?}", other);
                return Ok(empty_response(StatusCode::BAD_REQUEST));
            }
        };

        match self.node.client_request(value).await {
            Ok(state) => Ok(json_response(StatusCode::OK, &Command::ClientReply { state })),
            Err(e) => {
                warn!("client request failed: {}", e);
                Ok(empty_response(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }

    async fn decode_and_dispatch(&self, req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
        let command = match decode(req).await? {
            Ok(c) => c,
            Err(resp) => return Ok(resp),
        };

        let result = match command {
            Command::Prepare { ballot, .. } => self.node.acceptor().prepare(ballot).await,
            Command::Promise { from_uri, ballot, voted } => {
                self.node.proposer().promise(from_uri, ballot, voted).await
            }
            Command::Accept { ballot, voted, .. } => self.node.acceptor().accept(ballot, voted).await,
            Command::Accepted { from_uri, ballot, voted } => {
                self.node.proposer().accepted(from_uri, ballot, voted).await
            }
            other => {
                warn!("unexpected message on intra-cluster route: {:?}", other);
                return Ok(empty_response(StatusCode::BAD_REQUEST));
            }
        };

        match result {
            Ok(()) => Ok(json_response(StatusCode::OK, &Command::Ok)),
            Err(e) => {
                warn!("dispatch failed: {}", e);
                Ok(empty_response(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}

/// Decode a request body into a `Command`, or an already-built error
/// response if that fails.
async fn decode(req: Request<Body>) -> Result<Result<Command, Response<Body>>, hyper::Error> {
    let bytes = hyper::body::to_bytes(req.into_body()).await?;
    match serde_json::from_slice(&bytes) {
        Ok(c) => Ok(Ok(c)),
        Err(e) => {
            warn!("failed to decode request body: {}", e);
            Ok(Err(empty_response(StatusCode::BAD_REQUEST)))
        }
    }
}

fn json_response(status: StatusCode, command: &Command) -> Response<Body> {
    let body = serde_json::to_vec(command).expect("Command always serializes");
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("static response is well-formed")
}

fn text_response(status: StatusCode, body: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(body.to_string()))
        .expect("static response is well-formed")
}

fn empty_response(status: StatusCode) -> Response<Body> {
    let mut resp = Response::default();
    *resp.status_mut() = status;
    resp
}
