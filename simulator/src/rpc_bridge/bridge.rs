use crate::workflow::config::ServiceConfig;
use crate::workflow::player::VideoPlayers;
use crate::workflow::runner::QueryRunner;
use anyhow::{anyhow, bail, Context};
use iqrcore::session::{methods, RpcFault, RpcReply, RpcRequest};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};
use tokio::runtime::Builder;
use warp::Filter;

const IS_EXECUTING: &str = "query:isExecuting";
const GET_RESULT_COUNT: &str = "query:getResultCount";

pub fn bind_address(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// The remote side of a viewer session: one query runner and its players.
pub struct SimulatedService {
    runner: QueryRunner,
    players: Mutex<VideoPlayers>,
}

impl SimulatedService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            runner: QueryRunner::new(config),
            players: Mutex::new(VideoPlayers::default()),
        }
    }

    pub fn runner(&self) -> &QueryRunner {
        &self.runner
    }

    fn players(&self) -> MutexGuard<'_, VideoPlayers> {
        self.players.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers one request in the `{"result"}` / `{"error"}` reply shape.
    pub fn handle(&self, request: &RpcRequest) -> RpcReply {
        match self.dispatch(request) {
            Ok(value) => RpcReply::Result(value),
            Err(err) => {
                warn!("{} failed: {err:#}", request.method);
                RpcReply::Error(RpcFault {
                    message: err.to_string(),
                    detail: err.chain().skip(1).map(ToString::to_string).collect(),
                })
            }
        }
    }

    pub fn dispatch(&self, request: &RpcRequest) -> anyhow::Result<Value> {
        debug!("rpc {} {:?}", request.method, request.args);
        let args = Args(&request.args);
        let value = match request.method.as_str() {
            methods::GET_QUERY_URL => json!(self.runner.query_url()),
            methods::EXECUTE_QUERY => {
                let accepted = self.runner.execute_query(
                    args.str(0)?,
                    args.str(1)?,
                    args.u64(2)? as usize,
                )?;
                json!(accepted)
            }
            methods::IS_COMPLETED => json!(self.runner.is_completed()),
            IS_EXECUTING => json!(self.runner.is_executing()),
            GET_RESULT_COUNT => json!(self.runner.result_count()),
            methods::GET_ALL_RESULTS => {
                let offset = args.optional_u64(0)?.unwrap_or(0) as usize;
                let limit = args.optional_u64(1)?.map(|limit| limit as usize);
                serde_json::to_value(self.runner.get_all_results(offset, limit))?
            }
            methods::GET_STATUS => json!(self.runner.get_status()),
            methods::SET_RESULT_FEEDBACK => {
                let code = u8::try_from(args.u64(1)?).context("classification code out of range")?;
                json!(self.runner.set_result_feedback(args.i64(0)?, code)?)
            }
            methods::REFINE => json!(self.runner.refine()),
            methods::SHUT_DOWN => {
                self.runner.shut_down();
                Value::Null
            }
            methods::CREATE_VIDEO_PLAYER => json!(self.players().create()),
            methods::SET_VIDEO_DATA => {
                let result = self.runner.result(args.i64(1)?);
                json!(self.players().set_video_data(args.i64(0)?, result.as_ref()))
            }
            methods::RENDER => {
                for line in self.players().render() {
                    debug!("render {line}");
                }
                Value::Null
            }
            methods::PLAY => json!(self.players().play(args.i64(0)?)?),
            methods::STOP => {
                self.players().stop(args.i64(0)?)?;
                Value::Null
            }
            methods::SEEK => json!(self.players().seek(args.i64(0)?, args.f64(1)?)?),
            methods::SET_TRAILS_VISIBLE => {
                self.players()
                    .set_trails_visible(args.i64(0)?, args.bool(1)?)?;
                Value::Null
            }
            other => bail!("Unknown method {other}"),
        };
        Ok(value)
    }
}

/// Positional argument accessors.
struct Args<'a>(&'a [Value]);

impl<'a> Args<'a> {
    fn get(&self, index: usize) -> anyhow::Result<&'a Value> {
        self.0
            .get(index)
            .ok_or_else(|| anyhow!("missing argument {index}"))
    }

    fn str(&self, index: usize) -> anyhow::Result<&'a str> {
        self.get(index)?
            .as_str()
            .ok_or_else(|| anyhow!("argument {index} is not a string"))
    }

    fn i64(&self, index: usize) -> anyhow::Result<i64> {
        self.get(index)?
            .as_i64()
            .ok_or_else(|| anyhow!("argument {index} is not an integer"))
    }

    fn u64(&self, index: usize) -> anyhow::Result<u64> {
        self.get(index)?
            .as_u64()
            .ok_or_else(|| anyhow!("argument {index} is not a non-negative integer"))
    }

    fn optional_u64(&self, index: usize) -> anyhow::Result<Option<u64>> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.u64(index).map(Some),
        }
    }

    fn f64(&self, index: usize) -> anyhow::Result<f64> {
        self.get(index)?
            .as_f64()
            .ok_or_else(|| anyhow!("argument {index} is not a number"))
    }

    fn bool(&self, index: usize) -> anyhow::Result<bool> {
        self.get(index)?
            .as_bool()
            .ok_or_else(|| anyhow!("argument {index} is not a boolean"))
    }
}

/// `POST /rpc`, `GET /health` and `GET /config`.
pub fn routes(
    service: Arc<SimulatedService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let service_filter = warp::any().map(move || service.clone());

    let rpc_route = warp::path("rpc")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(service_filter.clone())
        .map(|request: RpcRequest, service: Arc<SimulatedService>| {
            warp::reply::json(&service.handle(&request))
        });

    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({"status": "ok"})));

    let config_route = warp::path("config")
        .and(warp::path::end())
        .and(warp::get())
        .and(service_filter)
        .map(|service: Arc<SimulatedService>| {
            warp::reply::json(&service.runner().config().viewer)
        });

    rpc_route.or(health_route).or(config_route)
}

/// Hosts the RPC endpoint on a background thread.
pub struct RpcBridge {
    address: SocketAddr,
}

impl RpcBridge {
    pub fn spawn(service: Arc<SimulatedService>, address: SocketAddr) -> Self {
        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build bridge runtime: {err}");
                    return;
                }
            };
            runtime.block_on(async move {
                warp::serve(routes(service)).run(address).await;
            });
        });
        info!("RPC bridge listening on http://{address}");
        Self { address }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }
}
