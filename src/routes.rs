use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

/// The maximum form data size to accept. Kept slightly above the
/// 50 MiB upload cap so oversized submissions reach the validator and
/// receive a specific error instead of a blunt rejection.
const MAX_CONTENT_LENGTH: u64 = 64 * 1024 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        ActiveConflict => StatusCode::CONFLICT,
        FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        NotAnAudioFile { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        Forbidden => StatusCode::FORBIDDEN,
        NonExistentId(..) => StatusCode::NOT_FOUND,
        InvalidId(..)
        | MalformedFormSubmission
        | MalformedUploadMetadata { .. }
        | MissingField(..)
        | PartsMissing
        | UnrecognizedTag(..) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::multipart::form;
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, path::param as par, post, put, query};

    use super::{handlers, query as q, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    fn authorization(
    ) -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone {
        warp::header::optional::<String>("authorization")
    }

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name<O: Clone + Send + Sync + 'static>(environment: Environment<O>) -> Route {
            let r = environment.urls.recordings_path.clone();

            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(r));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_list_route => list, rt; query::<q::ListQuery>(), end(), g());
    route!(make_current_route => current, rt; p("current"), query::<q::ListQuery>(), end(), g());
    route!(make_retrieve_route => retrieve, rt; par::<String>(), end(), g());
    route!(make_publish_route => publish, rt; end(), post(), authorization(), warp::body::json());
    route!(make_upload_route => upload, rt; p("upload"), end(), post(), authorization(), form().max_length(MAX_CONTENT_LENGTH));
    route!(make_update_route => update, rt; par::<String>(), end(), put(), authorization(), warp::body::json());
    route!(make_delete_route => delete, rt; par::<String>(), end(), delete(), authorization());
}
