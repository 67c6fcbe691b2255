use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::contract::{
    CoreRequest, CoreResponse, DetailsResponse, RecentFolderDto, RecentsResponse,
    ResultsResponse, SearchResultDto, TransferRequest, TransferResponse,
};
use crate::controller::QueryState;
use crate::notify::{AnswerMapPrompt, Notification, RecordingNotifier};
use crate::session::{Session, SessionError};

const DEFAULT_POLL_BUDGET: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJson,
    Selection,
    Query,
    Browse,
    Transfer,
    Store,
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    pub notification: Option<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransportResponse {
    Ok { response: CoreResponse },
    Err { error: ErrorResponse },
}

pub fn handle_request(session: &mut Session, request: CoreRequest) -> TransportResponse {
    let mut notifier = RecordingNotifier::default();
    match dispatch(session, request, &mut notifier) {
        Ok(response) => TransportResponse::Ok { response },
        Err(error) => TransportResponse::Err {
            error: map_session_error(error, notifier.toasts.into_iter().next()),
        },
    }
}

pub fn handle_json(session: &mut Session, payload: &str) -> String {
    let response = match serde_json::from_str::<CoreRequest>(payload) {
        Ok(request) => handle_request(session, request),
        Err(error) => TransportResponse::Err {
            error: ErrorResponse {
                code: ErrorCode::InvalidJson,
                message: error.to_string(),
                notification: None,
            },
        },
    };

    serde_json::to_string(&response).unwrap_or_else(|error| {
        format!(
            "{{\"status\":\"err\",\"error\":{{\"code\":\"invalid_json\",\"message\":{:?},\"notification\":null}}}}",
            error.to_string()
        )
    })
}

fn dispatch(
    session: &mut Session,
    request: CoreRequest,
    notifier: &mut RecordingNotifier,
) -> Result<CoreResponse, SessionError> {
    match request {
        CoreRequest::Search(search) => {
            session.search(&search.text, notifier)?;
            session.poll(search.budget.unwrap_or(DEFAULT_POLL_BUDGET), notifier);
            Ok(results_response(session, notifier))
        }
        CoreRequest::Poll(poll) => {
            session.poll(poll.budget.unwrap_or(DEFAULT_POLL_BUDGET), notifier);
            Ok(results_response(session, notifier))
        }
        CoreRequest::Browse(browse) => {
            session.navigate_to(Path::new(&browse.path), notifier)?;
            Ok(results_response(session, notifier))
        }
        CoreRequest::Up => {
            session.navigate_up(notifier)?;
            Ok(results_response(session, notifier))
        }
        CoreRequest::Recents => Ok(recents_response(session)),
        CoreRequest::ForgetRecent(forget) => {
            session.forget_recent(Path::new(&forget.path))?;
            Ok(recents_response(session))
        }
        CoreRequest::Transfer(request) => transfer(session, request, notifier),
        CoreRequest::ToggleDetails => Ok(CoreResponse::Details(DetailsResponse {
            show_details: session.toggle_details()?,
        })),
    }
}

fn transfer(
    session: &mut Session,
    request: TransferRequest,
    notifier: &mut RecordingNotifier,
) -> Result<CoreResponse, SessionError> {
    if let Some(files) = request.files {
        session.set_selection(files.into_iter().map(PathBuf::from).collect());
    }

    let mut prompt = AnswerMapPrompt::new(request.overwrite, request.overwrite_existing);
    let summary = session.transfer_to(
        request.mode,
        Path::new(&request.destination),
        &mut prompt,
        notifier,
    )?;

    Ok(CoreResponse::Transfer(TransferResponse {
        summary,
        close_window: notifier.close_requested,
        notifications: std::mem::take(&mut notifier.toasts),
        huds: std::mem::take(&mut notifier.huds),
    }))
}

fn recents_response(session: &Session) -> CoreResponse {
    CoreResponse::Recents(RecentsResponse {
        folders: session
            .recent_folders()
            .iter()
            .map(RecentFolderDto::from)
            .collect(),
    })
}

fn results_response(session: &Session, notifier: &mut RecordingNotifier) -> CoreResponse {
    let controller = session.controller();
    CoreResponse::Results(ResultsResponse {
        state: state_label(controller.state()).to_string(),
        search_text: controller.search_text().to_string(),
        browse_path: controller
            .browse_path()
            .map(|path| path.to_string_lossy().into_owned()),
        querying: controller.is_querying(),
        results: controller
            .results()
            .iter()
            .map(SearchResultDto::from)
            .collect(),
        notifications: std::mem::take(&mut notifier.toasts),
    })
}

pub fn state_label(state: QueryState) -> &'static str {
    match state {
        QueryState::Idle => "idle",
        QueryState::Searching => "searching",
        QueryState::Browsing => "browsing",
    }
}

fn map_session_error(error: SessionError, notification: Option<Notification>) -> ErrorResponse {
    let code = match &error {
        SessionError::Config(_) => ErrorCode::Config,
        SessionError::Store(_) => ErrorCode::Store,
        SessionError::Selection(_) => ErrorCode::Selection,
        SessionError::Query(_) => ErrorCode::Query,
        SessionError::Browse(_) => ErrorCode::Browse,
        SessionError::Transfer(_) => ErrorCode::Transfer,
    };
    ErrorResponse {
        code,
        message: error.to_string(),
        notification,
    }
}
