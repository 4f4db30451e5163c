//! In-process fakes of the Consul agent endpoints used by `CatalogDiscovery`
//! and of a DNS server for `DnsDiscovery`

use hickory_resolver::proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_resolver::proto::rr::{Name, RData, Record, RecordType};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;

#[derive(Default)]
struct AgentState {
    /// Registration bodies keyed by service id
    services: BTreeMap<String, Value>,
    no_leader: bool,
    fail_writes: bool,
}

impl AgentState {
    fn route(&mut self, method: &Method, path: &str, body: &[u8]) -> (StatusCode, Value) {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let get = *method == Method::GET;
        match segments.as_slice() {
            ["v1", "status", "leader"] if get => {
                if self.no_leader {
                    (StatusCode::INTERNAL_SERVER_ERROR, json!("No cluster leader"))
                } else {
                    (StatusCode::OK, json!("127.0.0.1:8300"))
                }
            }
            ["v1", "catalog", "service", name] if get => (StatusCode::OK, self.catalog(name)),
            ["v1", "agent", "checks"] if get => (StatusCode::OK, self.checks()),
            ["v1", "agent", "service", "register"] => {
                if *method == Method::PUT {
                    self.register(body)
                } else {
                    (StatusCode::METHOD_NOT_ALLOWED, json!("method not allowed"))
                }
            }
            _ => (StatusCode::NOT_FOUND, json!("not found")),
        }
    }

    fn register(&mut self, body: &[u8]) -> (StatusCode, Value) {
        if self.fail_writes {
            return (StatusCode::INTERNAL_SERVER_ERROR, json!("write failed"));
        }
        let registration: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => return (StatusCode::BAD_REQUEST, json!(e.to_string())),
        };
        let id = registration
            .get("ID")
            .or_else(|| registration.get("Name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.services.insert(id, registration);
        (StatusCode::OK, Value::Null)
    }

    fn catalog(&self, name: &str) -> Value {
        let nodes: Vec<Value> = self
            .services
            .iter()
            .filter(|(_, registration)| registration["Name"] == name)
            .map(|(id, registration)| {
                json!({
                    "Node": "fake-agent",
                    "Address": "127.0.0.1",
                    "ServiceID": id,
                    "ServiceName": registration["Name"],
                    "ServiceAddress": registration["Address"],
                    "ServicePort": registration["Port"],
                    "ServiceTags": registration["Tags"],
                })
            })
            .collect();
        Value::Array(nodes)
    }

    fn checks(&self) -> Value {
        let mut checks = Map::new();
        for (id, registration) in &self.services {
            if registration.get("Check").map_or(false, |check| !check.is_null()) {
                let check_id = format!("service:{}", id);
                checks.insert(
                    check_id.clone(),
                    json!({
                        "CheckID": check_id,
                        "Name": format!("Service '{}' check", registration["Name"].as_str().unwrap_or_default()),
                        "Status": "critical",
                        "ServiceID": id,
                        "ServiceName": registration["Name"],
                    }),
                );
            }
        }
        Value::Object(checks)
    }
}

/// A fake agent listening on an ephemeral local port
pub struct FakeCatalog {
    addr: SocketAddr,
    state: Arc<Mutex<AgentState>>,
    server: JoinHandle<()>,
}

impl FakeCatalog {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(AgentState::default()));

        let server_state = state.clone();
        let server = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = server_state.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| handle(req, state.clone()));
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { addr, state, server }
    }

    /// A URL nothing is listening on
    pub async fn unused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_leader(&self, leader: bool) {
        self.state.lock().unwrap().no_leader = !leader;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn last_registration(&self, id: &str) -> Option<Value> {
        self.state.lock().unwrap().services.get(id).cloned()
    }

    pub fn check_definition(&self, id: &str) -> Option<Value> {
        self.last_registration(id).and_then(|registration| registration.get("Check").cloned())
    }
}

impl Drop for FakeCatalog {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<Mutex<AgentState>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => Bytes::new(),
    };

    let (status, payload) = state.lock().unwrap().route(&method, &path, &body);
    let response = Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(payload.to_string())))
        .unwrap();
    Ok(response)
}

#[derive(Default)]
struct ZoneState {
    records: Vec<Record>,
    /// Every question received, in arrival order
    queries: Vec<(Name, RecordType)>,
}

impl ZoneState {
    fn answer(&mut self, request: &Message) -> Message {
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(OpCode::Query)
            .set_authoritative(true)
            .set_recursion_desired(request.recursion_desired())
            .set_recursion_available(true);

        for query in request.queries() {
            self.queries.push((query.name().clone(), query.query_type()));
            response.add_query(query.clone());

            let mut known = false;
            for record in self.records.iter().filter(|record| record.name() == query.name()) {
                known = true;
                if record.record_type() == query.query_type() {
                    response.add_answer(record.clone());
                }
            }
            if !known {
                response.set_response_code(ResponseCode::NXDomain);
            }
        }
        response
    }
}

/// A fake authoritative DNS server answering UDP queries on an ephemeral port.
///
/// Names without records get NXDOMAIN; known names asked for a missing type
/// get an empty NOERROR answer.
pub struct FakeDns {
    addr: SocketAddr,
    state: Arc<Mutex<ZoneState>>,
    server: JoinHandle<()>,
}

impl FakeDns {
    pub async fn start() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ZoneState::default()));

        let server_state = state.clone();
        let server = tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                let request = match Message::from_vec(&buf[..len]) {
                    Ok(request) => request,
                    Err(_) => continue,
                };
                let response = server_state.lock().unwrap().answer(&request);
                if let Ok(bytes) = response.to_vec() {
                    let _ = socket.send_to(&bytes, peer).await;
                }
            }
        });

        Self { addr, state, server }
    }

    /// Server entry in the form `DnsDiscovery` accepts
    pub fn server(&self) -> String {
        self.addr.to_string()
    }

    pub fn add(&self, name: &str, ttl: u32, rdata: RData) {
        let record = Record::from_rdata(Name::from_ascii(name).unwrap(), ttl, rdata);
        self.state.lock().unwrap().records.push(record);
    }

    /// Record types asked for `name`, in arrival order
    pub fn queried_types(&self, name: &str) -> Vec<RecordType> {
        let name = Name::from_ascii(name).unwrap();
        self.state
            .lock()
            .unwrap()
            .queries
            .iter()
            .filter(|(queried, _)| *queried == name)
            .map(|(_, record_type)| *record_type)
            .collect()
    }
}

impl Drop for FakeDns {
    fn drop(&mut self) {
        self.server.abort();
    }
}
