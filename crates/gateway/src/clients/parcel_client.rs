//! gRPC client for parcel-service.

use std::str::FromStr;

use serde::Serialize;
use tonic::transport::Channel;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{
    Caller, CreateParcel, PageMeta, ParcelDetails, ParcelQuery, ParcelResponse, ParcelStatus,
    SenderContact, StatusEntry, TrackedStatus, TrackingView, UpdateParcel, UserRole,
};
use proto::parcel::{
    parcel_service_client::ParcelServiceClient as ProtoParcelServiceClient, CallerRequest,
    CreateParcelRequest, ListParcelsRequest, ParcelCollection, ParcelPage as ProtoParcelPage,
    ParcelRequest, PingRequest, TrackParcelRequest, TrackingResponse, UpdateParcelRequest,
    UpdateParcelStatusRequest,
};

use super::{parse_timestamp, parse_uuid};

const SOURCE: &str = "parcel-service";

/// One page of parcels with its paging metadata.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParcelPage {
    pub data: Vec<ParcelResponse>,
    pub meta: PageMeta,
}

/// Unpaged parcel list with its size.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParcelList {
    pub data: Vec<ParcelResponse>,
    pub total: u64,
}

/// gRPC client wrapper for parcel-service.
pub struct ParcelClient {
    client: ProtoParcelServiceClient<Channel>,
}

impl ParcelClient {
    /// Connect to parcel-service.
    pub async fn connect(endpoint: &str) -> Result<Self, tonic::transport::Error> {
        debug!("Connecting to parcel-service at {}", endpoint);
        let client = ProtoParcelServiceClient::connect(endpoint.to_string()).await?;
        Ok(Self { client })
    }

    pub async fn create_parcel(
        &self,
        caller: Caller,
        input: CreateParcel,
    ) -> AppResult<ParcelResponse> {
        let request = tonic::Request::new(CreateParcelRequest {
            caller_id: caller.id.to_string(),
            caller_role: caller.role.to_string(),
            receiver_email: input.receiver_email,
            address: input.address,
            phone: input.phone,
            weight: input.weight,
            note: input.note,
            rate: input.rate,
        });

        let mut client = self.client.clone();
        let response = client.create_parcel(request).await.map_err(AppError::from)?;
        proto_to_parcel(response.into_inner())
    }

    pub async fn update_parcel(
        &self,
        caller: Caller,
        id: Uuid,
        update: UpdateParcel,
    ) -> AppResult<ParcelResponse> {
        let request = tonic::Request::new(UpdateParcelRequest {
            caller_id: caller.id.to_string(),
            caller_role: caller.role.to_string(),
            id: id.to_string(),
            receiver_email: update.receiver_email,
            address: update.address,
            phone: update.phone,
            weight: update.weight,
            note: update.note,
            current_status: update.current_status,
            touches_status_history: update.touches_status_history,
        });

        let mut client = self.client.clone();
        let response = client.update_parcel(request).await.map_err(AppError::from)?;
        proto_to_parcel(response.into_inner())
    }

    pub async fn cancel_parcel(&self, caller: Caller, id: Uuid) -> AppResult<ParcelResponse> {
        let mut client = self.client.clone();
        let response = client
            .cancel_parcel(parcel_request(caller, id))
            .await
            .map_err(AppError::from)?;
        proto_to_parcel(response.into_inner())
    }

    pub async fn confirm_delivery(&self, caller: Caller, id: Uuid) -> AppResult<ParcelResponse> {
        let mut client = self.client.clone();
        let response = client
            .confirm_delivery(parcel_request(caller, id))
            .await
            .map_err(AppError::from)?;
        proto_to_parcel(response.into_inner())
    }

    /// Admin status change. `status` is passed through unparsed so the
    /// lifecycle engine reports a missing or unknown value itself.
    pub async fn update_status(
        &self,
        caller: Caller,
        id: Uuid,
        status: Option<String>,
    ) -> AppResult<ParcelResponse> {
        let request = tonic::Request::new(UpdateParcelStatusRequest {
            caller_id: caller.id.to_string(),
            caller_role: caller.role.to_string(),
            id: id.to_string(),
            status,
        });

        let mut client = self.client.clone();
        let response = client
            .update_parcel_status(request)
            .await
            .map_err(AppError::from)?;
        proto_to_parcel(response.into_inner())
    }

    pub async fn delete_parcel(&self, caller: Caller, id: Uuid) -> AppResult<ParcelResponse> {
        let mut client = self.client.clone();
        let response = client
            .delete_parcel(parcel_request(caller, id))
            .await
            .map_err(AppError::from)?;
        proto_to_parcel(response.into_inner())
    }

    pub async fn get_parcel(&self, caller: Caller, id: Uuid) -> AppResult<ParcelResponse> {
        let mut client = self.client.clone();
        let response = client
            .get_parcel(parcel_request(caller, id))
            .await
            .map_err(AppError::from)?;
        proto_to_parcel(response.into_inner())
    }

    pub async fn list_parcels(&self, caller: Caller, query: ParcelQuery) -> AppResult<ParcelPage> {
        let request = tonic::Request::new(ListParcelsRequest {
            caller_id: caller.id.to_string(),
            caller_role: caller.role.to_string(),
            status: query.status.map(|status| status.to_string()),
            page: Some(query.page),
            limit: Some(query.limit),
        });

        let mut client = self.client.clone();
        let response = client.list_parcels(request).await.map_err(AppError::from)?;
        proto_to_page(response.into_inner())
    }

    pub async fn incoming_parcels(&self, caller: Caller) -> AppResult<ParcelList> {
        let mut client = self.client.clone();
        let response = client
            .incoming_parcels(caller_request(caller))
            .await
            .map_err(AppError::from)?;
        proto_to_list(response.into_inner())
    }

    pub async fn delivery_history(&self, caller: Caller) -> AppResult<ParcelList> {
        let mut client = self.client.clone();
        let response = client
            .delivery_history(caller_request(caller))
            .await
            .map_err(AppError::from)?;
        proto_to_list(response.into_inner())
    }

    /// Public lookup by tracking id.
    pub async fn track(&self, tracking_id: String) -> AppResult<TrackingView> {
        let request = tonic::Request::new(TrackParcelRequest { tracking_id });

        let mut client = self.client.clone();
        let response = client.track_parcel(request).await.map_err(AppError::from)?;
        proto_to_tracking(response.into_inner())
    }

    /// Whether parcel-service can reach its database.
    pub async fn ping(&self) -> AppResult<bool> {
        let mut client = self.client.clone();
        let response = client
            .ping(tonic::Request::new(PingRequest {}))
            .await
            .map_err(AppError::from)?;
        Ok(response.into_inner().database)
    }
}

fn parcel_request(caller: Caller, id: Uuid) -> tonic::Request<ParcelRequest> {
    tonic::Request::new(ParcelRequest {
        caller_id: caller.id.to_string(),
        caller_role: caller.role.to_string(),
        id: id.to_string(),
    })
}

fn caller_request(caller: Caller) -> tonic::Request<CallerRequest> {
    tonic::Request::new(CallerRequest {
        caller_id: caller.id.to_string(),
        caller_role: caller.role.to_string(),
    })
}

fn proto_to_details(proto: Option<proto::parcel::ParcelDetails>) -> AppResult<ParcelDetails> {
    let proto = proto.ok_or_else(|| AppError::internal("Parcel details missing from parcel-service"))?;
    Ok(ParcelDetails {
        address: proto.address,
        phone: proto.phone,
        weight: proto.weight,
        note: proto.note,
    })
}

fn proto_to_status(raw: &str) -> AppResult<ParcelStatus> {
    ParcelStatus::from_str(raw)
        .map_err(|_| AppError::internal(format!("Invalid status '{}' from {}", raw, SOURCE)))
}

fn proto_to_parcel(proto: proto::parcel::ParcelResponse) -> AppResult<ParcelResponse> {
    let status_history = proto
        .status_history
        .iter()
        .map(|entry| {
            Ok(StatusEntry {
                status: proto_to_status(&entry.status)?,
                updated_at: parse_timestamp(&entry.updated_at, SOURCE)?,
                updated_by: parse_uuid(&entry.updated_by, SOURCE)?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ParcelResponse {
        id: parse_uuid(&proto.id, SOURCE)?,
        tracking_id: proto.tracking_id,
        sender_id: parse_uuid(&proto.sender_id, SOURCE)?,
        receiver_email: proto.receiver_email,
        details: proto_to_details(proto.details)?,
        fee: proto.fee,
        current_status: proto_to_status(&proto.current_status)?,
        status_history,
        is_deleted: proto.is_deleted,
        created_at: parse_timestamp(&proto.created_at, SOURCE)?,
        updated_at: parse_timestamp(&proto.updated_at, SOURCE)?,
    })
}

fn proto_to_page(proto: ProtoParcelPage) -> AppResult<ParcelPage> {
    let meta = proto
        .meta
        .ok_or_else(|| AppError::internal("Page metadata missing from parcel-service"))?;

    Ok(ParcelPage {
        data: proto
            .parcels
            .into_iter()
            .map(proto_to_parcel)
            .collect::<AppResult<_>>()?,
        meta: PageMeta {
            page: meta.page,
            limit: meta.limit,
            total_page: meta.total_page,
            total_documents: meta.total_documents,
        },
    })
}

fn proto_to_list(proto: ParcelCollection) -> AppResult<ParcelList> {
    Ok(ParcelList {
        data: proto
            .parcels
            .into_iter()
            .map(proto_to_parcel)
            .collect::<AppResult<_>>()?,
        total: proto.total,
    })
}

fn proto_to_tracking(proto: TrackingResponse) -> AppResult<TrackingView> {
    let status_history = proto
        .status_history
        .iter()
        .map(|entry| {
            Ok(TrackedStatus {
                status: proto_to_status(&entry.status)?,
                updated_at: parse_timestamp(&entry.updated_at, SOURCE)?,
                updated_by_role: entry
                    .updated_by_role
                    .as_deref()
                    .map(UserRole::from_str)
                    .transpose()?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let sender = proto
        .sender
        .ok_or_else(|| AppError::internal("Sender contact missing from parcel-service"))?;

    Ok(TrackingView {
        receiver_email: proto.receiver_email,
        details: proto_to_details(proto.details)?,
        fee: proto.fee,
        current_status: proto_to_status(&proto.current_status)?,
        status_history,
        sender: SenderContact {
            name: sender.name,
            email: sender.email,
            phone: sender.phone,
        },
        created_at: parse_timestamp(&proto.created_at, SOURCE)?,
        updated_at: parse_timestamp(&proto.updated_at, SOURCE)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::parcel::{SenderContact as ProtoSender, StatusEntry as ProtoEntry};

    const SENDER_ID: &str = "3d1c7f0e-1111-4a4a-8c8c-000000000001";
    const AT: &str = "2026-05-04T12:00:00+00:00";

    fn details() -> proto::parcel::ParcelDetails {
        proto::parcel::ParcelDetails {
            address: "12 Harbour St".to_string(),
            phone: "+15550100".to_string(),
            weight: 5.0,
            note: None,
        }
    }

    fn proto_parcel() -> proto::parcel::ParcelResponse {
        proto::parcel::ParcelResponse {
            id: "3d1c7f0e-1111-4a4a-8c8c-0000000000aa".to_string(),
            tracking_id: "TRK-20260504-123456".to_string(),
            sender_id: SENDER_ID.to_string(),
            receiver_email: "rae@example.com".to_string(),
            details: Some(details()),
            fee: 50.0,
            current_status: "IN_TRANSIT".to_string(),
            status_history: vec![
                ProtoEntry {
                    status: "PENDING".to_string(),
                    updated_at: AT.to_string(),
                    updated_by: SENDER_ID.to_string(),
                },
                ProtoEntry {
                    status: "IN_TRANSIT".to_string(),
                    updated_at: AT.to_string(),
                    updated_by: SENDER_ID.to_string(),
                },
            ],
            is_deleted: false,
            created_at: AT.to_string(),
            updated_at: AT.to_string(),
        }
    }

    #[test]
    fn converts_parcel_with_history() {
        let parcel = proto_to_parcel(proto_parcel()).unwrap();
        assert_eq!(parcel.current_status, ParcelStatus::InTransit);
        assert_eq!(parcel.status_history.len(), 2);
        assert_eq!(parcel.status_history[0].status, ParcelStatus::Pending);
        assert_eq!(parcel.details.weight, 5.0);
    }

    #[test]
    fn missing_details_is_internal() {
        let proto = proto::parcel::ParcelResponse {
            details: None,
            ..proto_parcel()
        };
        assert!(matches!(proto_to_parcel(proto), Err(AppError::Internal(_))));
    }

    #[test]
    fn unknown_status_is_internal() {
        let proto = proto::parcel::ParcelResponse {
            current_status: "LOST".to_string(),
            ..proto_parcel()
        };
        assert!(matches!(proto_to_parcel(proto), Err(AppError::Internal(_))));
    }

    #[test]
    fn page_keeps_meta() {
        let page = proto_to_page(ProtoParcelPage {
            parcels: vec![proto_parcel()],
            meta: Some(proto::parcel::PageMeta {
                page: 2,
                limit: 1,
                total_page: 3,
                total_documents: 3,
            }),
        })
        .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.meta.total_page, 3);
        assert_eq!(page.meta.page, 2);
    }

    #[test]
    fn tracking_view_keeps_roles_only() {
        let view = proto_to_tracking(TrackingResponse {
            receiver_email: "rae@example.com".to_string(),
            details: Some(details()),
            fee: 50.0,
            current_status: "PENDING".to_string(),
            status_history: vec![proto::parcel::TrackedStatus {
                status: "PENDING".to_string(),
                updated_at: AT.to_string(),
                updated_by_role: Some("SENDER".to_string()),
            }],
            sender: Some(ProtoSender {
                name: "Sam".to_string(),
                email: "sam@example.com".to_string(),
                phone: None,
            }),
            created_at: AT.to_string(),
            updated_at: AT.to_string(),
        })
        .unwrap();

        assert_eq!(view.status_history[0].updated_by_role, Some(UserRole::Sender));
        assert_eq!(view.sender.name, "Sam");
    }
}
