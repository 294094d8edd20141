//! Sample events for the `publish` command.

use chrono::Utc;
use fhircast_core::{
  FhirCastMessage, HubEvent,
  event::{DiagnosticReportOpen, DiagnosticReportOpened, DiagnosticReportUpdate},
  resource::{
    Bundle, DiagnosticReport, DiagnosticReportStatusUpdate, Identifier,
    ImagingStudy, Issue, OperationOutcome, Reference, ResourceFragment,
  },
};
use uuid::Uuid;

/// A report being opened together with the imaging study it reads.
pub fn diagnostic_report_open(topic: &str, accession_number: &str) -> FhirCastMessage {
  let study_id = Uuid::new_v4().to_string();

  let report = DiagnosticReport {
    id:            Uuid::new_v4().to_string(),
    status:        "status".into(),
    subject:       Reference::new("subject reference"),
    imaging_study: vec![Reference::new(format!("ImagingStudy/{study_id}"))],
  };
  let study = ImagingStudy {
    id:          study_id,
    description: "description".into(),
    started:     Utc::now().fixed_offset(),
    status:      "status".into(),
    identifier:  vec![Identifier::accession(accession_number)],
    subject:     Reference::new("reference"),
  };

  FhirCastMessage::new(HubEvent::DiagnosticReportOpen(DiagnosticReportOpen {
    topic:      topic.to_string(),
    version_id: String::new(),
    context:    vec![
      ResourceFragment::DiagnosticReport { resource: report },
      ResourceFragment::ImagingStudy { resource: study },
    ],
  }))
}

/// Acknowledgement that a report was opened.
pub fn diagnostic_report_opened(topic: &str) -> FhirCastMessage {
  FhirCastMessage::new(HubEvent::DiagnosticReportOpened(DiagnosticReportOpened {
    topic:   topic.to_string(),
    context: vec![ResourceFragment::OperationOutcome {
      reference: Reference::new(""),
      resource:  OperationOutcome {
        issue: vec![Issue {
          severity:    "information".into(),
          diagnostics: "Report opened".into(),
        }],
      },
    }],
  }))
}

/// A status change for one report, as a transaction bundle.
pub fn diagnostic_report_update(topic: &str, status: &str) -> FhirCastMessage {
  let bundle = Bundle::transaction([DiagnosticReportStatusUpdate {
    id:     Uuid::new_v4().to_string(),
    status: status.to_string(),
  }]);

  FhirCastMessage::new(HubEvent::DiagnosticReportUpdate(DiagnosticReportUpdate {
    topic:   topic.to_string(),
    context: vec![ResourceFragment::Updates { resource: bundle }],
  }))
}

#[cfg(test)]
mod tests {
  use fhircast_core::{EventModel, HubChannelScope};
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn samples_pass_validation() {
    let model = EventModel::new();
    for (message, scope) in [
      (diagnostic_report_open("test", "ABCD"), HubChannelScope::DiagnosticReportOpen),
      (diagnostic_report_opened("test"), HubChannelScope::DiagnosticReportOpened),
      (diagnostic_report_update("test", "partial"), HubChannelScope::DiagnosticReportUpdate),
    ] {
      let validated = model
        .validate(&message.to_value())
        .unwrap_or_else(|f| panic!("{scope}: {f}"));
      assert_eq!(validated.scope(), scope);
      assert_eq!(validated.event.topic(), "test");
    }
  }

  #[test]
  fn report_references_its_study() {
    let message = diagnostic_report_open("t", "XYZ");
    let [
      ResourceFragment::DiagnosticReport { resource: report },
      ResourceFragment::ImagingStudy { resource: study },
    ] = message.event.context()
    else {
      panic!("unexpected context");
    };
    assert_eq!(report.imaging_study[0].reference, format!("ImagingStudy/{}", study.id));
    assert_eq!(study.accession_number(), Some("XYZ"));
  }

  #[test]
  fn update_carries_requested_status() {
    let value = diagnostic_report_update("t", "final").to_value();
    let entry = &value["event"]["context"][0]["resource"]["entry"][0];
    assert_eq!(entry["request"]["method"], "PUT");
    assert_eq!(entry["resource"]["status"], "final");
  }
}
