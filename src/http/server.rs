use std::convert::Infallible;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot::Receiver;

use hyper::{Body, Method, Request, Response, Server, StatusCode};
use hyper::service::{make_service_fn, service_fn};

use serde::{Deserialize, Serialize};

use image::RgbImage;
use log::{error, info};

use crate::model::{SceneItem, SceneModel, TreeStats};
use crate::quadtree::{Rect, Uid};


pub const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RENDER_SIZE: u32 = 512;


#[derive(Serialize, Deserialize, Debug)]
pub enum ApiRequest {
    TreeSave{file_name: String, },
    TreeLoad{file_name: String, },
    TreeClear{},

    ItemsAdd {items: Vec<SceneItem>, },
    ItemsDel {area: Rect, uid: Option<Uid>, },
    ItemsMove {uid: Uid, x: f64, y: f64, },

    Query {area: Rect, },
    Extent {},

    RenderTree{size: Option<u32>, },
}


#[derive(Serialize, Deserialize, Debug)]
pub enum ApiResponse {
    Success { },
    Error { err: String, },
    InsertReply { uids: Vec<Uid>, },
    RemovedReply { items: Vec<SceneItem>, },
    QueryReply { items: Vec<SceneItem>, },
    ExtentReply { extent: Rect, depth: usize, nodes: usize, items: usize, },
    #[serde(skip_serializing, skip_deserializing)]
    RenderReply { image: RgbImage },
}

impl ApiResponse {
    fn error<E: std::fmt::Display>(err: E) -> Self {
        ApiResponse::Error { err: err.to_string() }
    }
}


#[derive(Clone)]
pub struct ApiHandler {
    scene: Arc<SceneModel>,
}


impl ApiHandler {
    pub fn new(scene: Arc<SceneModel>) -> Self {
        Self {
            scene
        }
    }


    async fn handle_request(&self, req: Request<Body>) -> Result<Response<Body>, Infallible> {
        // reading the request body as bytes
        let body_bytes = match hyper::body::to_bytes(req.into_body()).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("Api::error body reading - {err}");
                let response = ApiResponse::Error {err: format!("Failed to read request body: {err}") };
                return Ok(Self::serialize_response(&response));
            }
        };

        // trying to deserialize it from json to an enum instance `ApiRequest`
        let api_response = match serde_json::from_slice::<ApiRequest>(&body_bytes) {
            Ok(api_request) => self.execute(api_request),

            // parsing failed, make a response that will include a description of the error
            Err(err) => {
                error!("Api::error request parsing - {err}");
                ApiResponse::Error {err: format!("Failed to parse request body: {err}") }
            }
        };

        Ok(Self::serialize_response(&api_response))
    }


    pub fn execute(&self, api_request: ApiRequest) -> ApiResponse {
        match api_request {
            ApiRequest::TreeSave{file_name}
                => self.handle_tree_save(&file_name),
            ApiRequest::TreeLoad{file_name}
                => self.handle_tree_load(&file_name),
            ApiRequest::TreeClear{}
                => self.handle_tree_clear(),

            ApiRequest::ItemsAdd {items}
                => self.handle_items_add(items),
            ApiRequest::ItemsDel {area, uid}
                => self.handle_items_del(&area, uid),
            ApiRequest::ItemsMove {uid, x, y}
                => self.handle_items_move(uid, x, y),

            ApiRequest::Query {area}
                => self.handle_query(&area),
            ApiRequest::Extent {}
                => self.handle_extent(),

            ApiRequest::RenderTree {size}
                => self.handle_render_tree(size),
        }
    }


    fn serialize_response(response: &ApiResponse) -> Response<Body> {
        let built = match response {
            // special case, RenderReply return png image, not json
            ApiResponse::RenderReply { image } => {
                let mut write_buffer = Cursor::new(Vec::with_capacity(image.width() as usize * image.height() as usize));
                match image.write_to(&mut write_buffer, image::ImageOutputFormat::Png) {
                    Ok(()) => {
                        let image_buffer = write_buffer.into_inner();
                        Response::builder()
                            .header("Content-Type", "image/png")
                            .header("Content-Length", image_buffer.len())
                            .body(Body::from(image_buffer))
                    }
                    Err(err) => {
                        error!("Api::error image encoding - {err}");
                        return Self::serialize_response(&ApiResponse::error(err));
                    }
                }
            }

            // common case, serialize reply to json
            _ => match serde_json::to_string(response) {
                Ok(response_body) => Response::builder()
                    .header("Content-Type", "application/json")
                    .body(response_body.into()),
                Err(err) => {
                    error!("Api::error response serializing - {err}");
                    Response::builder()
                        .status(StatusCode::INTERNAL_SERVER_ERROR)
                        .body(Body::empty())
                }
            },
        };

        built.unwrap_or_else(|err| {
            error!("Api::error response building - {err}");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
    }

    // Handlers
    fn handle_tree_save(&self, file_name: &str) -> ApiResponse {
        info!("Api::tree_save to {file_name}");
        match self.scene.save_state(file_name) {
            Ok(()) => ApiResponse::Success {},
            Err(err) => ApiResponse::error(err),
        }
    }


    fn handle_tree_load(&self, file_name: &str) -> ApiResponse {
        info!("Api::tree_load from {file_name}");
        match self.scene.load_state(file_name) {
            Ok(_) => ApiResponse::Success {},
            Err(err) => ApiResponse::error(err),
        }
    }


    fn handle_tree_clear(&self) -> ApiResponse {
        info!("Api::tree_clear");
        self.scene.clear_state();
        ApiResponse::Success {}
    }


    fn handle_items_add(&self, items: Vec<SceneItem>) -> ApiResponse {
        info!("Api::items_add {} items", items.len());
        match self.scene.insert_items(items) {
            Ok(uids) => ApiResponse::InsertReply { uids },
            Err(err) => ApiResponse::error(err),
        }
    }


    fn handle_items_del(&self, area: &Rect, uid: Option<Uid>) -> ApiResponse {
        info!("Api::items_del area: {}, {} - {}x{}, uid: {uid:?}", area.x, area.y, area.width, area.height);
        let items = self.scene.delete_items(area, uid);
        ApiResponse::RemovedReply { items }
    }


    fn handle_items_move(&self, uid: Uid, x: f64, y: f64) -> ApiResponse {
        info!("Api::items_move {uid} to {x}, {y}");
        match self.scene.move_item(uid, x, y) {
            Ok(()) => ApiResponse::Success {},
            Err(err) => ApiResponse::error(err),
        }
    }


    fn handle_query(&self, area: &Rect) -> ApiResponse {
        info!("Api::query area: {}, {} - {}x{}", area.x, area.y, area.width, area.height);
        let items = self.scene.query(area);
        ApiResponse::QueryReply { items }
    }


    fn handle_extent(&self) -> ApiResponse {
        let TreeStats { extent, depth, nodes, items } = self.scene.stats();
        info!("Api::extent {}, {} size {}", extent.x, extent.y, extent.width);
        ApiResponse::ExtentReply { extent, depth, nodes, items }
    }


    fn handle_render_tree(&self, size: Option<u32>) -> ApiResponse {
        let size = size.unwrap_or(DEFAULT_RENDER_SIZE);
        info!("Api::render_tree {size}x{size}");
        ApiResponse::RenderReply { image: self.scene.render(size) }
    }
}


async fn handle_request(api: Arc<ApiHandler>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.method() == Method::POST && req.uri().path() == "/api/" {
        let api = api.as_ref();
        return api.handle_request(req).await;
    }

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NOT_FOUND;

    Ok(response)
}


async fn http_svc(scene: Arc<SceneModel>, port: u16, http_stop: Receiver<()>) {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();

    let api_handler = Arc::new(ApiHandler::new(scene));

    let make_service = make_service_fn(move |_conn| {
        let api = api_handler.clone(); // clone the Arc reference
        let service = service_fn(move |req| {
            handle_request(api.clone(), req) // use the Arc reference
        });

        async move { Ok::<_, Infallible>(service) }
    });

    let server = match Server::try_bind(&addr) {
        Ok(builder) => builder.serve(make_service),
        Err(err) => {
            error!("cannot bind {addr}: {err}");
            return;
        }
    };

    let server = server.with_graceful_shutdown(async {
        http_stop.await.ok();
    });

    info!("Listening on http://{}", addr);
    if let Err(e) = server.await {
        error!("server error: {}", e);
    } else {
        info!("server stopped successfully")
    }
}

pub fn http_server_service(scene: Arc<SceneModel>, port: u16, http_stop: Receiver<()>) {
    // start http service in single thread runtime
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .thread_name("http_server_thread")
        .build();

    match rt {
        // block thread while service is running
        Ok(rt) => rt.block_on(http_svc(scene, port, http_stop)),
        Err(err) => error!("cannot start http runtime: {err}"),
    }
}
