//! gRPC implementation for ParcelService.

use std::str::FromStr;
use std::sync::Arc;

use tonic::{Request, Response, Status};

use super::{parse_caller, parse_uuid};
use crate::service::ParcelService;
use common::AppError;
use domain::{CreateParcel, Parcel, ParcelQuery, ParcelStatus, TrackingView, UpdateParcel};
use proto::parcel::{
    parcel_service_server::ParcelService as ParcelServiceProto, CallerRequest,
    CreateParcelRequest, ListParcelsRequest, PageMeta, ParcelCollection, ParcelDetails,
    ParcelPage, ParcelRequest, ParcelResponse, PingRequest, PingResponse, SenderContact,
    StatusEntry, TrackParcelRequest, TrackedStatus, TrackingResponse, UpdateParcelRequest,
    UpdateParcelStatusRequest,
};

/// gRPC service wrapper for ParcelService.
pub struct ParcelGrpcService {
    service: Arc<dyn ParcelService>,
}

impl ParcelGrpcService {
    pub fn new(service: Arc<dyn ParcelService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl ParcelServiceProto for ParcelGrpcService {
    async fn create_parcel(
        &self,
        request: Request<CreateParcelRequest>,
    ) -> Result<Response<ParcelResponse>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;

        let input = CreateParcel {
            receiver_email: req.receiver_email,
            address: req.address,
            phone: req.phone,
            weight: req.weight,
            note: req.note,
            rate: req.rate,
        };

        let parcel = self
            .service
            .create_parcel(caller, input)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(parcel_to_proto(&parcel)))
    }

    async fn update_parcel(
        &self,
        request: Request<UpdateParcelRequest>,
    ) -> Result<Response<ParcelResponse>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;
        let id = parse_uuid(&req.id)?;

        let update = UpdateParcel {
            receiver_email: req.receiver_email,
            address: req.address,
            phone: req.phone,
            weight: req.weight,
            note: req.note,
            current_status: req.current_status,
            touches_status_history: req.touches_status_history,
        };

        let parcel = self
            .service
            .update_parcel(caller, id, update)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(parcel_to_proto(&parcel)))
    }

    async fn cancel_parcel(
        &self,
        request: Request<ParcelRequest>,
    ) -> Result<Response<ParcelResponse>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;
        let id = parse_uuid(&req.id)?;

        let parcel = self
            .service
            .cancel_parcel(caller, id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(parcel_to_proto(&parcel)))
    }

    async fn confirm_delivery(
        &self,
        request: Request<ParcelRequest>,
    ) -> Result<Response<ParcelResponse>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;
        let id = parse_uuid(&req.id)?;

        let parcel = self
            .service
            .confirm_delivery(caller, id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(parcel_to_proto(&parcel)))
    }

    async fn update_parcel_status(
        &self,
        request: Request<UpdateParcelStatusRequest>,
    ) -> Result<Response<ParcelResponse>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;
        let id = parse_uuid(&req.id)?;
        let status = parse_status(req.status.as_deref())?;

        let parcel = self
            .service
            .update_status(caller, id, status)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(parcel_to_proto(&parcel)))
    }

    async fn delete_parcel(
        &self,
        request: Request<ParcelRequest>,
    ) -> Result<Response<ParcelResponse>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;
        let id = parse_uuid(&req.id)?;

        let parcel = self
            .service
            .delete_parcel(caller, id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(parcel_to_proto(&parcel)))
    }

    async fn get_parcel(
        &self,
        request: Request<ParcelRequest>,
    ) -> Result<Response<ParcelResponse>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;
        let id = parse_uuid(&req.id)?;

        let parcel = self
            .service
            .get_parcel(caller, id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(parcel_to_proto(&parcel)))
    }

    async fn list_parcels(
        &self,
        request: Request<ListParcelsRequest>,
    ) -> Result<Response<ParcelPage>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;
        let status = parse_status(req.status.as_deref())?;
        let query = ParcelQuery::new(status, req.page, req.limit);

        let page = self
            .service
            .list_parcels(caller, query)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(ParcelPage {
            parcels: page.data.iter().map(parcel_to_proto).collect(),
            meta: Some(PageMeta {
                page: page.meta.page,
                limit: page.meta.limit,
                total_page: page.meta.total_page,
                total_documents: page.meta.total_documents,
            }),
        }))
    }

    async fn incoming_parcels(
        &self,
        request: Request<CallerRequest>,
    ) -> Result<Response<ParcelCollection>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;

        let parcels = self
            .service
            .incoming_parcels(caller)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(collection(&parcels)))
    }

    async fn delivery_history(
        &self,
        request: Request<CallerRequest>,
    ) -> Result<Response<ParcelCollection>, Status> {
        let req = request.into_inner();
        let caller = parse_caller(&req.caller_id, &req.caller_role)?;

        let parcels = self
            .service
            .delivery_history(caller)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(collection(&parcels)))
    }

    async fn track_parcel(
        &self,
        request: Request<TrackParcelRequest>,
    ) -> Result<Response<TrackingResponse>, Status> {
        let req = request.into_inner();

        let view = self
            .service
            .track(&req.tracking_id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(tracking_to_proto(view)))
    }

    async fn ping(&self, _request: Request<PingRequest>) -> Result<Response<PingResponse>, Status> {
        let database = self.service.ping().await.is_ok();
        Ok(Response::new(PingResponse { database }))
    }
}

/// Absent or blank means "no status given".
fn parse_status(raw: Option<&str>) -> Result<Option<ParcelStatus>, Status> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => ParcelStatus::from_str(s)
            .map(Some)
            .map_err(|e| Status::from(AppError::from(e))),
        None => Ok(None),
    }
}

fn details_to_proto(details: &domain::ParcelDetails) -> ParcelDetails {
    ParcelDetails {
        address: details.address.clone(),
        phone: details.phone.clone(),
        weight: details.weight,
        note: details.note.clone(),
    }
}

fn parcel_to_proto(parcel: &Parcel) -> ParcelResponse {
    ParcelResponse {
        id: parcel.id.to_string(),
        tracking_id: parcel.tracking_id.clone(),
        sender_id: parcel.sender_id.to_string(),
        receiver_email: parcel.receiver_email.clone(),
        details: Some(details_to_proto(&parcel.details)),
        fee: parcel.fee,
        current_status: parcel.current_status.to_string(),
        status_history: parcel
            .status_history
            .iter()
            .map(|entry| StatusEntry {
                status: entry.status.to_string(),
                updated_at: entry.updated_at.to_rfc3339(),
                updated_by: entry.updated_by.to_string(),
            })
            .collect(),
        is_deleted: parcel.is_deleted,
        created_at: parcel.created_at.to_rfc3339(),
        updated_at: parcel.updated_at.to_rfc3339(),
    }
}

fn collection(parcels: &[Parcel]) -> ParcelCollection {
    ParcelCollection {
        parcels: parcels.iter().map(parcel_to_proto).collect(),
        total: parcels.len() as u64,
    }
}

fn tracking_to_proto(view: TrackingView) -> TrackingResponse {
    TrackingResponse {
        details: Some(details_to_proto(&view.details)),
        receiver_email: view.receiver_email,
        fee: view.fee,
        current_status: view.current_status.to_string(),
        status_history: view
            .status_history
            .into_iter()
            .map(|entry| TrackedStatus {
                status: entry.status.to_string(),
                updated_at: entry.updated_at.to_rfc3339(),
                updated_by_role: entry.updated_by_role.map(|role| role.to_string()),
            })
            .collect(),
        sender: Some(SenderContact {
            name: view.sender.name,
            email: view.sender.email,
            phone: view.sender.phone,
        }),
        created_at: view.created_at.to_rfc3339(),
        updated_at: view.updated_at.to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_status_means_none() {
        assert_eq!(parse_status(None).unwrap(), None);
        assert_eq!(parse_status(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_status(Some("in_transit")).unwrap(),
            Some(ParcelStatus::InTransit)
        );
    }

    #[test]
    fn unknown_status_is_invalid_argument() {
        let status = parse_status(Some("LOST")).unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
